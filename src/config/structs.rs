use std::path::Path;

use serde::{Deserialize, Serialize};

/// 环境变量前缀，例如 ATTR__SERVER__PORT=9999
const ENV_PREFIX: &str = "ATTR";

/// 静态配置，启动时加载一次
///
/// 优先级：ENV > TOML 文件 > 默认值。每个小节缺省字段单独回落到默认值，
/// 所以 TOML 里只写需要改的键即可。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StaticConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub stats: StatsConfig,
    pub codegen: CodegenConfig,
    pub cors: CorsConfig,
}

impl StaticConfig {
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    /// 文件可不存在；解析失败时打印原因并使用默认配置
    ///
    /// 日志系统此时尚未初始化，只能写 stderr
    pub fn load_from(path: &str) -> Self {
        match Self::try_load(path) {
            Ok(config) => {
                if Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] Invalid configuration ({}), using defaults", e);
                Self::default()
            }
        }
    }

    fn try_load(path: &str) -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File};

        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// 写出完整配置（含默认值），供 `config` 子命令生成模板
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cpu_count: usize,
    /// 对外 API 前缀（events / stats）
    pub api_prefix: String,
    /// 追踪链接重定向前缀
    pub redirect_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cpu_count: num_cpus::get(),
            api_prefix: "/v1".to_string(),
            redirect_prefix: "/r".to_string(),
        }
    }
}

/// 数据库连接，以及只读查询的重试参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub pool_size: u32,
    /// 连接 / 获取连接超时（秒），仅 MySQL / PostgreSQL
    pub timeout: u64,
    /// 首次失败后最多再试几次，0 表示不重试
    pub retry_count: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://attributor.db".to_string(),
            pool_size: 10,
            timeout: 30,
            retry_count: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// text / json
    pub format: String,
    pub file: Option<String>,
    pub max_backups: u32,
    pub enable_rotation: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
            max_backups: 5,
            enable_rotation: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub default_top_limit: u64,
    pub max_top_limit: u64,
    /// CSV 导出每批次行数
    pub export_batch_size: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            default_top_limit: 10,
            max_top_limit: 100,
            export_batch_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// 唯一约束冲突时的最大尝试次数
    pub max_attempts: u32,
    pub coupon_length: usize,
    pub short_code_length: usize,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            coupon_length: 8,
            short_code_length: 6,
        }
    }
}

/// dashboard 前端跨域访问 stats API
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allowed_origins: Vec<String>,
}
