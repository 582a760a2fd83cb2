// Keys promoted out of the label file into named AppInfo fields
pub const LABEL_APP: &str = "app";
pub const LABEL_RELEASE: &str = "release";

// Downward API env vars, set in the deployment spec
pub const ENV_POD_NAME: &str = "MY_POD_NAME";
pub const ENV_POD_NAMESPACE: &str = "MY_POD_NAMESPACE";

// Mounted by the podinfo downwardAPI volume, one key="value" per line
pub const LABELS_PATH: &str = "/etc/labels";
