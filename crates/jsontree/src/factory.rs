//! Pluggable node construction.
//!
//! Every node made by the parser, by host conversion or by the `Json::nil`,
//! `Json::object`, ... constructors goes through the active [`Factory`].
//! Resolution order: the factory attached to the current thread, then the
//! process-wide one, then [`DefaultFactory`].

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use indexmap::IndexMap;

use crate::number::Number;
use crate::value::{Data, Json};

pub trait Factory: Send + Sync {
    fn nil(&self) -> Json;
    fn boolean(&self, value: bool) -> Json;
    fn string(&self, value: String) -> Json;
    fn number(&self, value: Number) -> Json;
    fn array(&self) -> Json;
    fn object(&self) -> Json;

    /// Builds a tree from a host value, recursing through this factory.
    fn make(&self, value: &serde_json::Value) -> Json {
        use serde_json::Value;
        match value {
            Value::Null => self.nil(),
            Value::Bool(b) => self.boolean(*b),
            Value::Number(n) => self.number(host_number(n)),
            Value::String(s) => self.string(s.clone()),
            Value::Array(items) => {
                let array = self.array();
                for item in items {
                    array.push_child(self.make(item));
                }
                array
            }
            Value::Object(map) => {
                let object = self.object();
                for (key, item) in map {
                    object.insert_child(key.clone(), self.make(item));
                }
                object
            }
        }
    }
}

fn host_number(n: &serde_json::Number) -> Number {
    if let Some(signed) = n.as_i64() {
        Number::from_i64(signed)
    } else if let Some(unsigned) = n.as_u64() {
        Number::from_u64(unsigned)
    } else {
        Number::Double(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Plain nodes, nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFactory;

impl Factory for DefaultFactory {
    fn nil(&self) -> Json {
        Json::from_data(Data::Null)
    }

    fn boolean(&self, value: bool) -> Json {
        Json::from_data(Data::Bool(value))
    }

    fn string(&self, value: String) -> Json {
        Json::from_data(Data::String(value))
    }

    fn number(&self, value: Number) -> Json {
        Json::from_data(Data::Number(value))
    }

    fn array(&self) -> Json {
        Json::from_data(Data::Array(Vec::new()))
    }

    fn object(&self) -> Json {
        Json::from_data(Data::Object(IndexMap::new()))
    }
}

// ── Registry ──────────────────────────────────────────────────────────────

static GLOBAL: RwLock<Option<Arc<dyn Factory>>> = RwLock::new(None);

thread_local! {
    static LOCAL: RefCell<Option<Arc<dyn Factory>>> = const { RefCell::new(None) };
}

fn default_factory() -> Arc<dyn Factory> {
    static DEFAULT: OnceLock<Arc<dyn Factory>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(DefaultFactory)).clone()
}

/// The factory in effect for the calling thread.
pub fn current() -> Arc<dyn Factory> {
    if let Some(local) = LOCAL.with(|local| local.borrow().clone()) {
        return local;
    }
    let global = GLOBAL.read().unwrap_or_else(PoisonError::into_inner).clone();
    global.unwrap_or_else(default_factory)
}

/// Replaces the process-wide factory; `None` restores [`DefaultFactory`].
pub fn set_global(factory: Option<Arc<dyn Factory>>) {
    tracing::debug!(custom = factory.is_some(), "replacing global JSON factory");
    *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = factory;
}

/// Makes `factory` active on the calling thread until the guard drops.
/// Guards nest: dropping one restores whatever was attached before it.
#[must_use = "the factory is detached as soon as the guard is dropped"]
pub fn attach(factory: Arc<dyn Factory>) -> FactoryGuard {
    let previous = LOCAL.with(|local| local.borrow_mut().replace(factory));
    tracing::debug!(nested = previous.is_some(), "attached thread JSON factory");
    FactoryGuard {
        previous,
        _thread_bound: PhantomData,
    }
}

/// Removes any factory attached to the calling thread.
pub fn detach() {
    let removed = LOCAL.with(|local| local.borrow_mut().take());
    tracing::debug!(attached = removed.is_some(), "detached thread JSON factory");
}

pub struct FactoryGuard {
    previous: Option<Arc<dyn Factory>>,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for FactoryGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        tracing::trace!(restores = previous.is_some(), "restoring thread JSON factory");
        LOCAL.with(|local| *local.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts strings and upper-cases them.
    #[derive(Default)]
    struct Shouting {
        strings: AtomicUsize,
    }

    impl Factory for Shouting {
        fn nil(&self) -> Json {
            DefaultFactory.nil()
        }
        fn boolean(&self, value: bool) -> Json {
            DefaultFactory.boolean(value)
        }
        fn string(&self, value: String) -> Json {
            self.strings.fetch_add(1, Ordering::SeqCst);
            DefaultFactory.string(value.to_uppercase())
        }
        fn number(&self, value: Number) -> Json {
            DefaultFactory.number(value)
        }
        fn array(&self) -> Json {
            DefaultFactory.array()
        }
        fn object(&self) -> Json {
            DefaultFactory.object()
        }
    }

    #[test]
    fn attached_factory_builds_parsed_nodes() {
        let shouting = Arc::new(Shouting::default());
        {
            let _guard = attach(shouting.clone());
            let doc = Json::parse(r#"{"k": ["a", "b"]}"#).unwrap();
            assert_eq!(doc.to_string(), r#"{"k":["A","B"]}"#);
        }
        assert_eq!(shouting.strings.load(Ordering::SeqCst), 2);
        assert_eq!(Json::string("a").as_str().unwrap(), "a");
    }

    #[test]
    fn guards_nest() {
        let outer = Arc::new(Shouting::default());
        let _outer = attach(outer.clone());
        {
            let _inner = attach(Arc::new(DefaultFactory));
            assert_eq!(Json::string("x").as_str().unwrap(), "x");
        }
        assert_eq!(Json::string("x").as_str().unwrap(), "X");
        detach();
        assert_eq!(Json::string("x").as_str().unwrap(), "x");
    }

    struct Capture(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn scope_changes_are_traced() {
        let buffer = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || Capture(sink.clone()))
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let guard = attach(Arc::new(DefaultFactory));
            drop(guard);
            detach();
        });
        let logged = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("attached thread JSON factory"));
        assert!(logged.contains("detached thread JSON factory"));
    }

    #[test]
    fn host_values_go_through_make() {
        let shouting = Shouting::default();
        let doc = shouting.make(&serde_json::json!({"a": "b", "n": [1, 2.5, null]}));
        assert_eq!(doc.to_string(), r#"{"a":"B","n":[1,2.5,null]}"#);
        assert_eq!(shouting.strings.load(Ordering::SeqCst), 1);
    }
}
