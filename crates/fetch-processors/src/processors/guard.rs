//! Closure-backed veto processor.

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::error::ProcessorResult;
use crate::stage::{EntityPackage, Processor, ProcessorDecision};

/// Cancels the operation whenever its predicate returns `Err(reason)`.
///
/// Register it on a pre-stage; on a post-stage its vetoes are ignored by the
/// pipeline.
pub struct GuardProcessor<T, F> {
    name: String,
    check: F,
    _entity: PhantomData<fn(&T)>,
}

impl<T, F> GuardProcessor<T, F>
where
    F: Fn(&EntityPackage<'_, T>) -> Result<(), String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> Processor<T> for GuardProcessor<T, F>
where
    T: Sync,
    F: Fn(&EntityPackage<'_, T>) -> Result<(), String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, package: &EntityPackage<'_, T>) -> ProcessorResult<ProcessorDecision> {
        Ok(match (self.check)(package) {
            Ok(()) => ProcessorDecision::Continue,
            Err(reason) => ProcessorDecision::Cancel { reason },
        })
    }
}

impl<T, F> fmt::Debug for GuardProcessor<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardProcessor").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    #[tokio::test]
    async fn vetoes_on_error() {
        let guard = GuardProcessor::new("positive", |package: &EntityPackage<'_, i32>| {
            if *package.entity() > 0 {
                Ok(())
            } else {
                Err("must be positive".to_string())
            }
        });

        let ok = EntityPackage::new(Stage::Adding, &3, None).unwrap();
        assert_eq!(guard.process(&ok).await.unwrap(), ProcessorDecision::Continue);

        let bad = EntityPackage::new(Stage::Adding, &-1, None).unwrap();
        assert_eq!(
            guard.process(&bad).await.unwrap(),
            ProcessorDecision::cancel("must be positive")
        );
        assert_eq!(guard.name(), "positive");
    }
}
