use crate::error::ConfigError;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryTransport {
    Mqtt,
    Kafka,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerKind {
    FuelDrop,
    LowFuel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Roles {
    pub ingest: bool,
    pub notifier: bool,
    pub reporter: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: String,
    pub roles: Roles,

    pub telemetry_transport: TelemetryTransport,
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_topic: String,
    pub mqtt_username: String,
    pub mqtt_password: String,
    pub kafka_bootstrap_servers: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub kafka_auto_offset_reset: String,
    pub kafka_sasl_mechanism: String,
    pub kafka_username: String,
    pub kafka_password: String,
    pub kafka_security_protocol: String,
    pub kafka_max_retries: u32,
    pub kafka_circuit_breaker_cooldown: u64,
    pub ingest_channel_capacity: usize,
    pub http_bind: String,

    pub alert_queue: String,
    pub report_queue: String,
    pub queue_visibility_timeout_secs: u64,
    pub queue_wait_seconds: u64,
    pub queue_batch_size: u32,
    pub queue_max_receives: i32,

    pub publish_max_attempts: u32,
    pub publish_base_backoff_ms: u64,
    pub publish_max_backoff_ms: u64,

    pub scorer: ScorerKind,
    pub nominal_full_level: f64,
    pub drop_threshold: f64,
    pub low_fuel_threshold: f64,

    pub mail_relay_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    pub alert_email_to: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let db_host = text("DB_HOST", "localhost");
        let db_port = text("DB_PORT", "5432");
        let db_name = text("DB_DATABASE", "petroshield");
        let db_user = text("DB_USER", "petroshield");
        let db_pwd = text("DB_PWD", "petroshield");

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let roles = parse_roles(&text("PIPELINE_ROLES", "ingest,notifier,reporter"))?;

        let telemetry_transport = match text("TELEMETRY_TRANSPORT", "mqtt").to_lowercase().as_str() {
            "mqtt" => TelemetryTransport::Mqtt,
            "kafka" => TelemetryTransport::Kafka,
            "none" => TelemetryTransport::Disabled,
            other => {
                return Err(ConfigError::Invalid {
                    key: "TELEMETRY_TRANSPORT",
                    value: other.to_string(),
                })
            }
        };

        let scorer = match text("SCORER", "fuel_drop").to_lowercase().as_str() {
            "fuel_drop" => ScorerKind::FuelDrop,
            "low_fuel" => ScorerKind::LowFuel,
            other => {
                return Err(ConfigError::Invalid {
                    key: "SCORER",
                    value: other.to_string(),
                })
            }
        };

        let alert_queue = required(&lookup, "ALERT_QUEUE")?;
        let report_queue = required(&lookup, "REPORT_QUEUE")?;

        let (mail_relay_url, alert_email_to) = if roles.notifier {
            (
                required(&lookup, "MAIL_RELAY_URL")?,
                required(&lookup, "ALERT_EMAIL_TO")?,
            )
        } else {
            (text("MAIL_RELAY_URL", ""), text("ALERT_EMAIL_TO", ""))
        };

        let queue_batch_size: u32 = parse_or(&lookup, "QUEUE_BATCH_SIZE", 1)?;

        Ok(Self {
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 20)?,
            log_level: text("LOG_LEVEL", "info"),
            roles,

            telemetry_transport,
            mqtt_broker: text("MQTT_BROKER", "localhost"),
            mqtt_port: parse_or(&lookup, "MQTT_PORT", 1883)?,
            mqtt_topic: text("MQTT_TOPIC", "petroshield/fuel"),
            mqtt_username: text("MQTT_USERNAME", ""),
            mqtt_password: text("MQTT_PASSWORD", ""),
            kafka_bootstrap_servers: text("KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
            kafka_topic: text("KAFKA_TOPIC", "petroshield-fuel"),
            kafka_group_id: text("KAFKA_GROUP_ID", "petroshield-ingest"),
            kafka_auto_offset_reset: text("KAFKA_AUTO_OFFSET_RESET", "latest"),
            kafka_sasl_mechanism: text("KAFKA_SASL_MECHANISM", "SCRAM-SHA-256"),
            kafka_username: text("KAFKA_USERNAME", ""),
            kafka_password: text("KAFKA_PASSWORD", ""),
            kafka_security_protocol: text("KAFKA_SECURITY_PROTOCOL", "SASL_PLAINTEXT"),
            kafka_max_retries: parse_or(&lookup, "KAFKA_MAX_RETRIES", 5)?,
            kafka_circuit_breaker_cooldown: parse_or(&lookup, "KAFKA_CIRCUIT_BREAKER_COOLDOWN", 300)?,
            ingest_channel_capacity: parse_or(&lookup, "INGEST_CHANNEL_CAPACITY", 256)?,
            http_bind: text("HTTP_BIND", "0.0.0.0:3000"),

            alert_queue,
            report_queue,
            queue_visibility_timeout_secs: parse_or(&lookup, "QUEUE_VISIBILITY_TIMEOUT_SECS", 30)?,
            queue_wait_seconds: parse_or(&lookup, "QUEUE_WAIT_SECONDS", 10)?,
            queue_batch_size: queue_batch_size.clamp(1, 10),
            queue_max_receives: parse_or(&lookup, "QUEUE_MAX_RECEIVES", 5)?,

            publish_max_attempts: parse_or(&lookup, "PUBLISH_MAX_ATTEMPTS", 5)?,
            publish_base_backoff_ms: parse_or(&lookup, "PUBLISH_BASE_BACKOFF_MS", 200)?,
            publish_max_backoff_ms: parse_or(&lookup, "PUBLISH_MAX_BACKOFF_MS", 5000)?,

            scorer,
            nominal_full_level: parse_or(&lookup, "NOMINAL_FULL_LEVEL", 20.0)?,
            drop_threshold: parse_or(&lookup, "DROP_THRESHOLD", 5.0)?,
            low_fuel_threshold: parse_or(&lookup, "LOW_FUEL_THRESHOLD", 10.0)?,

            mail_relay_url,
            mail_api_key: text("MAIL_API_KEY", ""),
            mail_from: text("MAIL_FROM", "PetroShield Alerts <alerts@petroshield.com>"),
            alert_email_to,
        })
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_visibility_timeout_secs)
    }

    pub fn queue_wait(&self) -> Duration {
        Duration::from_secs(self.queue_wait_seconds)
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_roles(raw: &str) -> Result<Roles, ConfigError> {
    let mut roles = Roles::default();
    for role in raw.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        match role.to_lowercase().as_str() {
            "ingest" => roles.ingest = true,
            "notifier" => roles.notifier = true,
            "reporter" => roles.reporter = true,
            _ => {
                return Err(ConfigError::Invalid {
                    key: "PIPELINE_ROLES",
                    value: raw.to_string(),
                })
            }
        }
    }
    if roles == Roles::default() {
        return Err(ConfigError::Missing("PIPELINE_ROLES"));
    }
    Ok(roles)
}
