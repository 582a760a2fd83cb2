use std::collections::HashMap;

use serde::Serialize;

/// Runtime information about the pod serving the request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppInfo {
    pub pod_name: String,

    /// Value of the `app` label
    pub app_name: String,

    pub namespace: String,

    /// Value of the `release` label. Tells stable and canary apart.
    pub release: String,

    /// All the other labels on the pod
    pub labels: HashMap<String, String>,
}
