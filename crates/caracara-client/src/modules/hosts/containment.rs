//! Network containment

use caracara_filters::Fql;

use super::HostsApiModule;
use crate::error::{CaracaraError, Result};
use crate::model::Record;

impl HostsApiModule {
    /// Network contain every host matching the filter
    pub async fn contain(&self, filters: impl Into<Fql>) -> Result<Vec<Record>> {
        let fql = filters.into();
        if fql.is_none() {
            return Err(CaracaraError::MustProvideFilter);
        }

        let device_ids = self.get_device_ids(&fql).await?;
        self.perform_action("contain", &device_ids).await
    }

    /// Lift network containment from every host matching the filter
    pub async fn release(&self, filters: impl Into<Fql>) -> Result<Vec<Record>> {
        let fql = filters.into();
        if fql.is_none() {
            return Err(CaracaraError::MustProvideFilter);
        }

        let device_ids = self.get_device_ids(&fql).await?;
        self.perform_action("lift_containment", &device_ids).await
    }
}
