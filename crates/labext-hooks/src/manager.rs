//! Module manager: lifecycle management for hook modules.

use std::collections::HashMap;
use std::sync::Arc;

use labext_core::config::{HookConfig, ModuleConfig};
use labext_core::error::AppError;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::catalog::EventCatalog;
use crate::coroutine::{TickReport, TickScheduler};
use crate::hooks::dispatcher::HookDispatcher;
use crate::hooks::registry::{HookRegistry, RegistrationReport};
use crate::module::{HookModule, ModuleInfo};

/// Owns the registry, dispatcher, and scheduler, and loads modules into them.
#[derive(Debug)]
pub struct ModuleManager {
    /// Loaded modules by id.
    modules: RwLock<HashMap<String, Arc<dyn HookModule>>>,
    /// Hook registry.
    hook_registry: Arc<HookRegistry>,
    /// Hook dispatcher.
    hook_dispatcher: Arc<HookDispatcher>,
    /// Coroutine scheduler.
    scheduler: Arc<TickScheduler>,
    /// Module settings.
    config: ModuleConfig,
}

impl ModuleManager {
    /// Creates a manager over a fresh registry using `catalog`.
    pub fn new(catalog: Arc<EventCatalog>, hooks: HookConfig, config: ModuleConfig) -> Self {
        let hook_registry = Arc::new(HookRegistry::new(catalog));
        let scheduler = Arc::new(TickScheduler::from_config(&hooks));
        let hook_dispatcher = Arc::new(HookDispatcher::new(
            hook_registry.clone(),
            scheduler.clone(),
            hooks,
        ));

        Self {
            modules: RwLock::new(HashMap::new()),
            hook_registry,
            hook_dispatcher,
            scheduler,
            config,
        }
    }

    /// Loads a module and registers its hooks.
    ///
    /// The module map stays write-locked for the whole load, so concurrent
    /// loads of one id cannot both register. `on_load` must not call back
    /// into the manager.
    pub async fn load_module(
        &self,
        module: Arc<dyn HookModule>,
    ) -> Result<RegistrationReport, AppError> {
        let info = module.info();
        let module_id = info.id.clone();

        if self.config.is_disabled(&module_id) {
            info!(module_id = %module_id, "Module disabled by configuration, not loading");
            return Err(AppError::module(format!("Module '{}' is disabled", module_id)));
        }

        let mut modules = self.modules.write().await;
        if modules.contains_key(&module_id) {
            return Err(AppError::conflict(format!(
                "Module '{}' is already loaded",
                module_id
            )));
        }

        // Load
        module.on_load().await.map_err(|e| {
            error!(module_id = %module_id, error = %e, "Module load failed");
            AppError::module(format!("Module '{}' load failed: {}", module_id, e))
        })?;

        // Register hooks
        let report = match self.hook_registry.register_module(module.as_ref()) {
            Ok(report) => report,
            Err(e) => {
                error!(module_id = %module_id, error = %e, "Module discovery failed");
                if let Err(e) = module.on_unload().await {
                    warn!(module_id = %module_id, error = %e, "Module unload returned error");
                }
                return Err(e.into());
            }
        };

        modules.insert(module_id.clone(), module);
        drop(modules);

        info!(
            module_id = %module_id,
            name = %info.name,
            version = %info.version,
            hooks = report.registered,
            skipped = report.skipped,
            "Module loaded"
        );

        Ok(report)
    }

    /// Removes a module's hooks and unloads it. Returns how many handlers
    /// were removed.
    pub async fn unload_module(&self, module_id: &str) -> Result<usize, AppError> {
        let module = self
            .modules
            .write()
            .await
            .remove(module_id)
            .ok_or_else(|| AppError::not_found(format!("Module '{}' not found", module_id)))?;

        // Unregister hooks
        let removed = self.hook_registry.unregister_module(module.as_ref());

        // Unload
        if let Err(e) = module.on_unload().await {
            warn!(module_id = %module_id, error = %e, "Module unload returned error");
        }

        info!(module_id = %module_id, removed, "Module unloaded");

        Ok(removed)
    }

    /// Unloads all modules in id order.
    pub async fn unload_all(&self) -> Result<(), AppError> {
        let modules = self.list_modules().await;

        for info in &modules {
            if let Err(e) = self.unload_module(&info.id).await {
                error!(module_id = %info.id, error = %e, "Error unloading module");
            }
        }

        info!("All modules unloaded");
        Ok(())
    }

    /// Lists loaded modules, sorted by id.
    pub async fn list_modules(&self) -> Vec<ModuleInfo> {
        let modules = self.modules.read().await;
        let mut infos: Vec<ModuleInfo> = modules.values().map(|m| m.info()).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Returns whether a module with `module_id` is loaded.
    pub async fn is_loaded(&self, module_id: &str) -> bool {
        self.modules.read().await.contains_key(module_id)
    }

    /// Advances coroutine handlers by one tick.
    pub fn tick(&self) -> TickReport {
        self.scheduler.tick()
    }

    /// Returns the hook dispatcher for firing events.
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.hook_dispatcher
    }

    /// Returns the hook registry.
    pub fn hook_registry(&self) -> &Arc<HookRegistry> {
        &self.hook_registry
    }

    /// Returns the coroutine scheduler.
    pub fn scheduler(&self) -> &Arc<TickScheduler> {
        &self.scheduler
    }
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new(
            Arc::new(EventCatalog::builtin()),
            HookConfig::default(),
            ModuleConfig::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscoveryError;
    use crate::hooks::callable::Callable;
    use crate::module::{MethodDecl, TypeDecl};
    use async_trait::async_trait;
    use labext_core::error::ErrorKind;
    use labext_core::events::PlayerJoinedArgs;
    use labext_core::EventType;

    #[derive(Debug)]
    struct Greeter {
        fail_declare: bool,
    }

    #[async_trait]
    impl HookModule for Greeter {
        fn info(&self) -> ModuleInfo {
            ModuleInfo {
                id: "greeter".to_string(),
                name: "Greeter".to_string(),
                version: "1.0.0".to_string(),
                author: "test".to_string(),
                description: "Greets joining players".to_string(),
            }
        }

        async fn on_load(&self) -> Result<(), String> {
            // Give a concurrent load the chance to interleave.
            tokio::task::yield_now().await;
            Ok(())
        }

        fn declare(&self) -> Result<Vec<TypeDecl>, DiscoveryError> {
            if self.fail_declare {
                return Err(DiscoveryError::Declaration {
                    module: "greeter".to_string(),
                    reason: "broken".to_string(),
                });
            }
            let on_joined = Callable::for_event::<PlayerJoinedArgs, _, _>("on_joined", |_ev| {});
            Ok(vec![
                TypeDecl::new("Greeter").method(MethodDecl::new(on_joined).on("player_joined")),
            ])
        }
    }

    #[tokio::test]
    async fn test_load_and_unload() {
        let manager = ModuleManager::default();
        let report = manager
            .load_module(Arc::new(Greeter { fail_declare: false }))
            .await
            .unwrap();
        assert_eq!(report.registered, 1);
        assert!(manager.is_loaded("greeter").await);

        let err = manager
            .load_module(Arc::new(Greeter { fail_declare: false }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        assert_eq!(manager.unload_module("greeter").await.unwrap(), 1);
        assert!(!manager
            .hook_registry()
            .any_registered(EventType::of::<PlayerJoinedArgs>()));

        let err = manager.unload_module("greeter").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_disabled_module_is_refused() {
        let manager = ModuleManager::new(
            Arc::new(EventCatalog::builtin()),
            HookConfig::default(),
            ModuleConfig {
                disabled: vec!["greeter".to_string()],
            },
        );
        let err = manager
            .load_module(Arc::new(Greeter { fail_declare: false }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Module);
        assert!(manager.list_modules().await.is_empty());
    }

    #[tokio::test]
    async fn test_declaration_failure() {
        let manager = ModuleManager::default();
        let err = manager
            .load_module(Arc::new(Greeter { fail_declare: true }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Discovery);
        assert!(!manager.is_loaded("greeter").await);
    }

    #[tokio::test]
    async fn test_concurrent_loads_register_once() {
        let manager = ModuleManager::default();
        let (first, second) = tokio::join!(
            manager.load_module(Arc::new(Greeter { fail_declare: false })),
            manager.load_module(Arc::new(Greeter { fail_declare: false })),
        );

        let conflicts = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(e) if e.kind == ErrorKind::Conflict))
            .count();
        assert_eq!(conflicts, 1);
        assert!(first.is_ok() || second.is_ok());
        assert_eq!(manager.hook_registry().len(), 1);
        assert_eq!(manager.list_modules().await.len(), 1);
    }
}
