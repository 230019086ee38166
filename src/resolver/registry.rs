//! Helper registry: one strategy object per layer kind
//!
//! A helper materializes streams and/or containers for its kind; the
//! capability it lacks keeps the default method body and reports
//! `UnsupportedCapability`. Foreign formats register additional helpers
//! through `ResolverContext::register_helper`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::container::SharedContainer;
use crate::error::{VfsError, VfsResult};
use crate::resolver::context::ResolverContext;
use crate::resolver::helpers;
use crate::spec::PathSpecId;
use crate::stream::SharedStream;

pub trait ResolverHelper {
    /// Layer kind name this helper is registered under
    fn kind(&self) -> &str;

    fn open_stream(
        &self,
        _ctx: &mut ResolverContext,
        _spec: PathSpecId,
    ) -> VfsResult<SharedStream> {
        Err(VfsError::UnsupportedCapability {
            kind: self.kind().to_string(),
            capability: "stream",
        })
    }

    fn open_container(
        &self,
        _ctx: &mut ResolverContext,
        _spec: PathSpecId,
    ) -> VfsResult<SharedContainer> {
        Err(VfsError::UnsupportedCapability {
            kind: self.kind().to_string(),
            capability: "container",
        })
    }
}

pub struct HelperRegistry {
    helpers: HashMap<String, Rc<dyn ResolverHelper>>,
}

impl HelperRegistry {
    pub fn empty() -> Self {
        Self {
            helpers: HashMap::new(),
        }
    }

    /// Registry with every built-in layer kind pre-registered
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for helper in helpers::builtins() {
            // Built-in kinds are distinct by construction
            let _ = registry.register(helper);
        }
        registry
    }

    pub fn register(&mut self, helper: Rc<dyn ResolverHelper>) -> VfsResult<()> {
        let kind = helper.kind().to_string();
        if self.helpers.contains_key(&kind) {
            return Err(VfsError::HelperAlreadyRegistered { kind });
        }
        self.helpers.insert(kind, helper);
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<Rc<dyn ResolverHelper>> {
        self.helpers.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.helpers.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubHelper;

    impl ResolverHelper for StubHelper {
        fn kind(&self) -> &str {
            "STUB"
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = HelperRegistry::with_builtins();
        for kind in [
            "OS",
            "RAW",
            "DATA_RANGE",
            "COMPRESSED_STREAM",
            "ENCRYPTED_STREAM",
            "CPIO",
            "MOUNT",
        ] {
            assert!(registry.contains(kind), "missing builtin {}", kind);
        }
        assert_eq!(registry.len(), 7);
        assert!(!registry.contains("EWF"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = HelperRegistry::empty();
        registry.register(Rc::new(StubHelper)).unwrap();
        let err = registry.register(Rc::new(StubHelper)).unwrap_err();
        assert!(matches!(
            err,
            VfsError::HelperAlreadyRegistered { kind } if kind == "STUB"
        ));
    }

    #[test]
    fn test_default_capabilities_unsupported() {
        let helper = StubHelper;
        let mut ctx = ResolverContext::new();
        let spec = ctx
            .intern(
                crate::spec::LayerKind::Os {
                    location: "/x".to_string(),
                },
                None,
            )
            .unwrap();

        assert!(matches!(
            helper.open_stream(&mut ctx, spec),
            Err(VfsError::UnsupportedCapability { capability: "stream", .. })
        ));
        assert!(matches!(
            helper.open_container(&mut ctx, spec),
            Err(VfsError::UnsupportedCapability { capability: "container", .. })
        ));
    }
}
