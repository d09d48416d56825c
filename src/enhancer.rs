use crate::entry::LogEntry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Hook that adds data (usually labels) to every entry before it is shipped.
pub trait LoggingEnhancer: Send + Sync {
    fn enhance(&self, entry: &mut LogEntry);
}

/// Constructor stored in an [`EnhancerRegistry`].
pub type EnhancerFactory = Arc<dyn Fn() -> Box<dyn LoggingEnhancer> + Send + Sync>;

/// Returned by [`EnhancerRegistry::resolve`] for an unregistered name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("no enhancer registered under {0:?}")]
pub struct UnknownEnhancer(pub String);

/// Named enhancer constructors, populated by the application at startup.
///
/// Configuration refers to enhancers by name only; anything not registered
/// here cannot be instantiated.
#[derive(Clone, Default)]
pub struct EnhancerRegistry {
    factories: HashMap<String, EnhancerFactory>,
}

impl EnhancerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the enhancers shipped by this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("process", || Box::new(ProcessEnhancer));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn LoggingEnhancer> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name.trim())
    }

    /// Instantiate the enhancers named in `names`, in order.
    ///
    /// Blank names are skipped.
    pub fn resolve<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<Box<dyn LoggingEnhancer>>, UnknownEnhancer> {
        let mut enhancers = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            match self.factories.get(name) {
                Some(factory) => enhancers.push(factory()),
                None => return Err(UnknownEnhancer(name.to_string())),
            }
        }
        Ok(enhancers)
    }
}

/// Adds the current process id as the `pid` label.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnhancer;

impl LoggingEnhancer for ProcessEnhancer {
    fn enhance(&self, entry: &mut LogEntry) {
        entry.add_label("pid", std::process::id().to_string());
    }
}

/// Adds a fixed set of labels to every entry.
#[derive(Debug, Clone, Default)]
pub struct StaticLabelsEnhancer {
    labels: BTreeMap<String, String>,
}

impl StaticLabelsEnhancer {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }
}

impl LoggingEnhancer for StaticLabelsEnhancer {
    fn enhance(&self, entry: &mut LogEntry) {
        for (key, value) in &self.labels {
            entry.add_label(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{LogEvent, LogLevel};
    use crate::layout::StructuredLogRecordBuilder;

    fn entry() -> LogEntry {
        LogEntry::from_event(
            &LogEvent::new(LogLevel::Info, "x").with_thread("t").with_logger("l"),
            &StructuredLogRecordBuilder::default(),
            None,
        )
    }

    #[test]
    fn resolves_registered_enhancers_in_order() {
        let mut registry = EnhancerRegistry::with_builtins();
        registry.register("zone", || {
            let mut labels = BTreeMap::new();
            labels.insert("zone".to_string(), "europe-west1-b".to_string());
            Box::new(StaticLabelsEnhancer::new(labels))
        });

        let enhancers = registry.resolve(&["zone", " process ", ""]).unwrap();
        assert_eq!(enhancers.len(), 2);

        let mut e = entry();
        for enhancer in &enhancers {
            enhancer.enhance(&mut e);
        }
        assert_eq!(e.labels["zone"], "europe-west1-b");
        assert_eq!(e.labels["pid"], std::process::id().to_string());
        assert_eq!(e.labels["thread"], "t");
    }

    #[test]
    fn unknown_name_is_rejected() {
        let registry = EnhancerRegistry::new();
        let err = registry.resolve(&["com.example.Missing"]).err();
        assert_eq!(err, Some(UnknownEnhancer("com.example.Missing".to_string())));
        assert!(!registry.contains("process"));
        assert!(EnhancerRegistry::with_builtins().contains("process"));
    }
}
