//! Device store
//!
//! Devices are not kept here: the listings are paginated and large, so the
//! caller holds whatever page it fetched.

use super::report;
use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::models::{
    normalize_mac, AnyDevice, Device, DeviceQuery, DeviceUpdate, NewDevice, Page, PageRequest,
    UserDevice,
};
use crate::notify::{Notification, Notifier};
use futures_util::future::join_all;
use reqwest::Method;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// CRUD over `/network/devices/` and `/network/userdevices/`
#[derive(Clone)]
pub struct DeviceStore {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
}

impl DeviceStore {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    /// All devices, user-owned or not, ordered by id
    pub async fn fetch_devices(&self, page: PageRequest) -> Option<Page<AnyDevice>> {
        let result = self
            .client
            .get_json_query("/network/devices/", &page.query())
            .await;
        report(self.notifier.as_ref(), "Fetching devices", result)
    }

    /// Devices registered by users, with optional fuzzy filter and ordering
    pub async fn fetch_user_devices(&self, query: &DeviceQuery) -> Option<Page<UserDevice>> {
        let result = self
            .client
            .get_json_query("/network/userdevices/", &query.query())
            .await;
        report(self.notifier.as_ref(), "Fetching user devices", result)
    }

    /// Whitelisted devices, filtered and ordered on mac, name or mark
    pub async fn fetch_whitelist(&self, query: &DeviceQuery) -> Option<Page<Device>> {
        let result = self
            .client
            .get_json_query("/network/devices/whitelist/", &query.query())
            .await;
        report(self.notifier.as_ref(), "Fetching whitelist", result)
    }

    pub async fn fetch_device(&self, id: i64) -> Option<AnyDevice> {
        let result = self
            .client
            .get_json(&format!("/network/devices/{}/", id))
            .await;
        report(self.notifier.as_ref(), "Fetching device", result)
    }

    pub async fn delete_device(&self, id: i64) -> bool {
        let result = self
            .client
            .mutate_empty(Method::DELETE, &format!("/network/devices/{}/", id))
            .await;
        self.done(&format!("Deleting device {}", id), result)
    }

    pub async fn create_device(&self, device: &NewDevice) -> bool {
        let result = match prepare(device) {
            Ok(device) => {
                self.client
                    .mutate(Method::POST, "/network/devices/", Some(&device))
                    .await
            }
            Err(e) => Err(e),
        };
        self.done("Creating device", result)
    }

    /// Create many devices in one request (JSON array body)
    pub async fn create_devices_from_list(&self, devices: &[NewDevice]) -> bool {
        let prepared: Result<Vec<NewDevice>> = if devices.is_empty() {
            Err(ApiError::Validation("no devices to create".to_string()))
        } else {
            devices.iter().map(prepare).collect()
        };

        let result = match prepared {
            Ok(devices) => {
                self.client
                    .mutate(Method::POST, "/network/devices/", Some(&devices))
                    .await
            }
            Err(e) => Err(e),
        };
        self.done(&format!("Creating {} devices", devices.len()), result)
    }

    pub async fn edit_device(&self, id: i64, update: &DeviceUpdate) -> bool {
        self.patch(&format!("/network/devices/{}/", id), update).await
    }

    /// Edit a device through the user-device endpoint
    pub async fn edit_user_device(&self, id: i64, update: &DeviceUpdate) -> bool {
        self.patch(&format!("/network/userdevices/{}/", id), update).await
    }

    /// Assign marks to many devices at once.
    ///
    /// One CSRF refresh, then one PATCH per device, all in flight together.
    /// True only if every request succeeded.
    pub async fn change_userdevice_marks(&self, assignments: &BTreeMap<i64, u32>) -> bool {
        if assignments.is_empty() {
            return true;
        }

        let token = match self.client.refresh_csrf().await {
            Ok(token) => token,
            Err(e) => {
                report::<()>(self.notifier.as_ref(), "Changing marks", Err(e));
                return false;
            }
        };

        let client = &self.client;
        let token = token.as_str();
        let requests = assignments.iter().map(|(&id, &mark)| async move {
            let body = DeviceUpdate::mark(mark);
            let result = client
                .send_with_token(
                    Method::PATCH,
                    &format!("/network/devices/{}/", id),
                    Some(&body),
                    token,
                )
                .await;
            (id, result)
        });

        let mut failed = 0usize;
        for (id, result) in join_all(requests).await {
            if let Err(e) = result {
                failed += 1;
                warn!("Mark change for device {} failed: {}", id, e);
                self.notifier.notify(Notification::error(format!(
                    "Device {}: {}",
                    id,
                    e.user_message()
                )));
            }
        }

        if failed == 0 {
            info!("Changed marks of {} devices", assignments.len());
        } else {
            warn!("{} of {} mark changes failed", failed, assignments.len());
        }
        failed == 0
    }

    async fn patch(&self, path: &str, update: &DeviceUpdate) -> bool {
        let result = if update.is_empty() {
            Err(ApiError::Validation("nothing to update".to_string()))
        } else {
            let update = match &update.mac {
                Some(mac) => match normalize_mac(mac) {
                    Some(mac) => Ok(DeviceUpdate {
                        mac: Some(mac),
                        ..update.clone()
                    }),
                    None => Err(ApiError::Validation(format!("invalid MAC address {}", mac))),
                },
                None => Ok(update.clone()),
            };
            match update {
                Ok(update) => self.client.mutate(Method::PATCH, path, Some(&update)).await,
                Err(e) => Err(e),
            }
        };
        self.done(&format!("Editing {}", path), result)
    }

    fn done<T>(&self, action: &str, result: Result<T>) -> bool {
        let ok = report(self.notifier.as_ref(), action, result).is_some();
        if ok {
            info!("{} succeeded", action);
        }
        ok
    }
}

/// Normalize a new device before it is sent
fn prepare(device: &NewDevice) -> Result<NewDevice> {
    let mac = normalize_mac(&device.mac)
        .ok_or_else(|| ApiError::Validation(format!("invalid MAC address {}", device.mac)))?;
    Ok(NewDevice {
        mac,
        name: device.name.clone().filter(|n| !n.trim().is_empty()),
        ..device.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_normalizes() {
        let device = prepare(&NewDevice {
            name: Some("  ".to_string()),
            mac: "AA-BB-CC-DD-EE-FF".to_string(),
            whitelisted: true,
            mark: None,
        })
        .unwrap();
        assert_eq!(device.mac, "aa:bb:cc:dd:ee:ff");
        assert_eq!(device.name, None);
    }

    #[test]
    fn test_prepare_rejects_bad_mac() {
        let result = prepare(&NewDevice {
            name: None,
            mac: "nope".to_string(),
            whitelisted: false,
            mark: None,
        });
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
