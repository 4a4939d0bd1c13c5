//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `FACEFLOW__*` 覆盖
//! （双下划线表示嵌套，如 `FACEFLOW__PROVIDER__BACKEND=mock`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub network: NetworkSection,
}

/// [app] 段：应用名与会话启动时的默认捕获模式
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// "passive" / "active"；非法值按 passive 处理
    pub capture_mode: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            capture_mode: "passive".to_string(),
        }
    }
}

/// [provider] 段：后端选择（闭集 remote / mock）与 HTTP 参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// 持久化的后端标识；进程启动时解析一次，之后不可切换
    pub backend: String,
    pub base_url: String,
    pub api_key: Option<String>,
    /// 单次 capture / match 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 健康探测周期（秒）
    pub health_poll_secs: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            backend: "mock".to_string(),
            base_url: "http://127.0.0.1:18080".to_string(),
            api_key: None,
            request_timeout_secs: 30,
            health_poll_secs: 5,
        }
    }
}

/// [network] 段：compare 前连通性预检的探测地址与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub probe_addr: String,
    pub probe_timeout_ms: u64,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            probe_addr: "1.1.1.1:443".to_string(),
            probe_timeout_ms: 1500,
        }
    }
}

/// 从 config 目录加载配置，环境变量 FACEFLOW__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 FACEFLOW__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("FACEFLOW")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.provider.backend, "mock");
        assert_eq!(cfg.app.capture_mode, "passive");
        assert_eq!(cfg.provider.request_timeout_secs, 30);
        assert!(cfg.provider.api_key.is_none());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faceflow.toml");
        std::fs::write(
            &path,
            r#"
[provider]
backend = "remote"
base_url = "http://faces.internal:9000"

[app]
capture_mode = "active"
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.provider.backend, "remote");
        assert_eq!(cfg.provider.base_url, "http://faces.internal:9000");
        assert_eq!(cfg.app.capture_mode, "active");
        // 未出现的键保持默认
        assert_eq!(cfg.provider.health_poll_secs, 5);
    }
}
