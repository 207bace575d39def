/*!

The YAML options file that tells the suite where the hub and the candidate managed clusters are.

```yaml
options:
  hub:
    name: hub
    apiServerURL: https://api.hub.example.com:6443
    kubeconfig: /path/to/hub/kubeconfig
    kubecontext: admin
  managedClusters:
    - name: cluster1
      kubeconfig: /path/to/cluster1/kubeconfig
    # no kubeconfig: inferred from $KUBECONFIG, ~/.kube/config or the pod's service account
    - name: cluster2
  enableFeature: true
  polling:
    intervalSecs: 10
    addonTimeoutSecs: 300
```

!*/

use crate::error::{self, Result};
use model::poll::PollSettings;
use serde::Deserialize;
use snafu::{ensure, OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct OptionsFile {
    options: Options,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    pub hub: ClusterOptions,
    /// Candidates for the managed cluster to run against, in order of preference.
    #[serde(default)]
    pub managed_clusters: Vec<ClusterOptions>,
    /// Switch on the `managedserviceaccount` component of the hub's engine before running.
    #[serde(default)]
    pub enable_feature: bool,
    #[serde(default)]
    pub polling: PollingOptions,
}

/// How to reach one cluster's API server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOptions {
    pub name: String,
    /// Overrides the server address found in the kubeconfig.
    #[serde(default, rename = "apiServerURL")]
    pub api_server_url: Option<String>,
    /// When absent, the configuration is inferred from the environment.
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
    /// A context of `kubeconfig` other than its current one.
    #[serde(default)]
    pub kubecontext: Option<String>,
}

/// Waits check every `interval_secs`, which must not be zero, until their timeout has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollingOptions {
    pub interval_secs: u64,
    pub addon_timeout_secs: u64,
    pub account_timeout_secs: u64,
    pub deletion_timeout_secs: u64,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            addon_timeout_secs: 300,
            account_timeout_secs: 60,
            deletion_timeout_secs: 300,
        }
    }
}

impl PollingOptions {
    fn settings(&self, timeout_secs: u64) -> PollSettings {
        PollSettings::new(
            Duration::from_secs(self.interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    /// Waiting for the add-on to become available.
    pub fn addon(&self) -> PollSettings {
        self.settings(self.addon_timeout_secs)
    }

    /// Waiting for a new account to be issued its token.
    pub fn account(&self) -> PollSettings {
        self.settings(self.account_timeout_secs)
    }

    /// Waiting for a deleted object to disappear.
    pub fn deletion(&self) -> PollSettings {
        self.settings(self.deletion_timeout_secs)
    }
}

impl Options {
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .context(error::OptionsReadSnafu { path })?;
        Self::from_yaml(&data, path)
    }

    /// Parse the contents of an options file. `path` is only used in error messages.
    pub fn from_yaml(data: &str, path: &Path) -> Result<Self> {
        let file: OptionsFile =
            serde_yaml::from_str(data).context(error::OptionsParseSnafu { path })?;
        ensure!(
            file.options.polling.interval_secs > 0,
            error::ZeroIntervalSnafu { path }
        );
        Ok(file.options)
    }

    /// The names of the candidate managed clusters, in order.
    pub fn managed_cluster_names(&self) -> Vec<&str> {
        self.managed_clusters
            .iter()
            .map(|cluster| cluster.name.as_str())
            .collect()
    }

    pub fn managed_cluster(&self, name: &str) -> Result<&ClusterOptions> {
        self.managed_clusters
            .iter()
            .find(|cluster| cluster.name == name)
            .context(error::MissingClusterOptionsSnafu { name })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const FULL: &str = r#"
options:
  hub:
    name: hub
    apiServerURL: https://api.hub.example.com:6443
    kubeconfig: /tmp/hub.kubeconfig
    kubecontext: admin
  managedClusters:
    - name: cluster1
      kubeconfig: /tmp/cluster1.kubeconfig
    - name: cluster2
      kubeconfig: /tmp/cluster2.kubeconfig
      kubecontext: ctx2
  enableFeature: true
  polling:
    intervalSecs: 1
    addonTimeoutSecs: 30
"#;

    #[test]
    fn full_options() {
        let options = Options::from_yaml(FULL, Path::new("options.yaml")).unwrap();
        assert_eq!(options.hub.name, "hub");
        assert_eq!(
            options.hub.api_server_url.as_deref(),
            Some("https://api.hub.example.com:6443")
        );
        assert_eq!(options.hub.kubecontext.as_deref(), Some("admin"));
        assert_eq!(
            options.managed_cluster_names(),
            vec!["cluster1", "cluster2"]
        );
        assert!(options.enable_feature);

        let cluster2 = options.managed_cluster("cluster2").unwrap();
        assert_eq!(
            cluster2.kubeconfig,
            Some(PathBuf::from("/tmp/cluster2.kubeconfig"))
        );
        assert_eq!(cluster2.kubecontext.as_deref(), Some("ctx2"));
        assert!(options.managed_cluster("cluster3").is_err());

        // unset polling keys keep their defaults
        assert_eq!(
            options.polling.addon(),
            PollSettings::new(Duration::from_secs(1), Duration::from_secs(30))
        );
        assert_eq!(options.polling.account().timeout.as_secs(), 60);
        assert_eq!(options.polling.deletion().timeout.as_secs(), 300);
    }

    #[test]
    fn minimal_options() {
        let yaml = "options:\n  hub:\n    name: hub\n";
        let options = Options::from_yaml(yaml, Path::new("options.yaml")).unwrap();
        assert_eq!(options.hub.kubeconfig, None);
        assert!(options.managed_clusters.is_empty());
        assert!(!options.enable_feature);
        assert_eq!(options.polling, PollingOptions::default());
        assert_eq!(
            options.polling.addon(),
            PollSettings::new(Duration::from_secs(10), Duration::from_secs(300))
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        let yaml = "options:\n  hub:\n    name: hub\n  polling:\n    intervalSecs: 0\n";
        let err = Options::from_yaml(yaml, Path::new("o.yaml")).unwrap_err();
        assert!(matches!(err, crate::Error::ZeroInterval { .. }));
        assert!(err.to_string().contains("o.yaml"));

        let yaml = "options:\n  hub:\n    name: hub\n  polling:\n    intervalSecs: 1\n";
        assert!(Options::from_yaml(yaml, Path::new("o.yaml")).is_ok());
    }

    #[test]
    fn missing_hub() {
        let yaml = "options:\n  managedClusters: []\n";
        let err = Options::from_yaml(yaml, Path::new("o.yaml")).unwrap_err();
        assert!(err.to_string().contains("o.yaml"));
    }

    #[tokio::test]
    async fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.yaml");
        std::fs::write(&path, FULL).unwrap();
        let options = Options::load(&path).await.unwrap();
        assert_eq!(options.managed_clusters.len(), 2);

        let err = Options::load(&dir.path().join("missing.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::OptionsRead { .. }));
    }
}
