//! # Retransmission Validation
//!
//! Checks a connector runs before asking its administrator to re-deliver
//! data. Checks run in this order and the first failing one decides:
//!
//! 1. the permission exists
//! 2. it is `Accepted` or `Fulfilled`
//! 3. its data need is not an accounting-point need
//! 4. `[from, to]` lies inside the permission's validity
//! 5. `to` is before today

use cg_03_data_needs::DataNeedCatalog;
use shared_types::{
    Clock, DataNeedKind, PermissionRequest, PermissionStatus, RetransmissionRequest,
    RetransmissionResult, Timeframe,
};
use std::sync::Arc;

pub struct RetransmissionValidation {
    catalog: Arc<dyn DataNeedCatalog>,
    clock: Arc<dyn Clock>,
}

impl RetransmissionValidation {
    #[must_use]
    pub fn new(catalog: Arc<dyn DataNeedCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, clock }
    }

    /// `Ok` if the connector may go ahead, otherwise the result to answer
    /// with.
    pub fn validate(
        &self,
        permission: Option<&PermissionRequest>,
        request: &RetransmissionRequest,
    ) -> Result<(), RetransmissionResult> {
        let permission_id = request.permission_id.clone();
        let timestamp = self.clock.now();

        let Some(permission) = permission else {
            return Err(RetransmissionResult::PermissionRequestNotFound {
                permission_id,
                timestamp,
            });
        };

        if !matches!(
            permission.status,
            PermissionStatus::Accepted | PermissionStatus::Fulfilled
        ) {
            return Err(RetransmissionResult::NoActivePermission {
                permission_id,
                timestamp,
            });
        }

        let Some(need) = self.catalog.find(&permission.data_need_id) else {
            return Err(RetransmissionResult::Failure {
                permission_id,
                timestamp,
                reason: format!("Data need {} not found", permission.data_need_id),
            });
        };
        if matches!(need.kind, DataNeedKind::AccountingPoint) {
            return Err(RetransmissionResult::NotSupported {
                permission_id,
                timestamp,
                reason: "Retransmission of data for AccountingPointDataNeed not supported".into(),
            });
        }

        let inside_validity = match (permission.validity, Timeframe::new(request.from, request.to)) {
            (Some(validity), Ok(requested)) => validity.encloses(&requested),
            _ => false,
        };
        if !inside_validity {
            return Err(RetransmissionResult::NoPermissionForTimeFrame {
                permission_id,
                timestamp,
            });
        }

        if request.to >= timestamp.date_naive() {
            return Err(RetransmissionResult::NotSupported {
                permission_id,
                timestamp,
                reason: "Retransmission to date needs to be before today".into(),
            });
        }

        Ok(())
    }
}
