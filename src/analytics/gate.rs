use crate::analytics::config::EcommerceMode;
use crate::logger::CallLog;

/// Decides which e-commerce operations the configured mode allows.
///
/// Refusals are logged as warnings and the operation is skipped; nothing is raised.
#[derive(Clone, Debug)]
pub struct FeatureGate {
    mode: EcommerceMode,
    log: CallLog,
}

impl FeatureGate {
    pub fn new(mode: EcommerceMode, log: CallLog) -> Self {
        Self { mode, log }
    }

    pub fn mode(&self) -> EcommerceMode {
        self.mode
    }

    /// Transaction/item reporting, only valid in classic e-commerce mode.
    pub fn classic_ecommerce_allowed(&self, operation: &str, warn: bool) -> bool {
        let allowed = self.mode == EcommerceMode::Classic;
        if !allowed && warn {
            if self.mode == EcommerceMode::Enhanced {
                self.log.warn(format!(
                    "{operation} is not available when Enhanced Ecommerce is enabled"
                ));
            } else {
                self.log
                    .warn(format!("Ecommerce must be enabled to use {operation}"));
            }
        }
        allowed
    }

    /// Product/impression/promotion/action reporting, only valid in enhanced mode.
    pub fn enhanced_ecommerce_allowed(&self, operation: &str, warn: bool) -> bool {
        let allowed = self.mode == EcommerceMode::Enhanced;
        if !allowed && warn {
            self.log.warn(format!(
                "Enhanced Ecommerce must be enabled to use {operation}"
            ));
        }
        allowed
    }
}
