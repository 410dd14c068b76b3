pub const STATEMENTS: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS fuel_logs (
    id UUID PRIMARY KEY,
    sensor_id TEXT NOT NULL,
    vehicle_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    fuel_level DOUBLE PRECISION NOT NULL,
    latitude DOUBLE PRECISION NOT NULL,
    longitude DOUBLE PRECISION NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_fuel_logs_vehicle_recorded_at
ON fuel_logs (vehicle_id, recorded_at DESC);
"#,
    r#"
CREATE TABLE IF NOT EXISTS theft_alerts (
    id UUID PRIMARY KEY,
    fuel_log_id UUID NOT NULL UNIQUE REFERENCES fuel_logs (id),
    vehicle_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING'
        CHECK (status IN ('PENDING', 'REVIEWED', 'CONFIRMED', 'DISMISSED')),
    description TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS notification_logs (
    id UUID PRIMARY KEY,
    alert_id UUID,
    user_id TEXT NOT NULL,
    message TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
    r#"
CREATE UNIQUE INDEX IF NOT EXISTS uq_notification_logs_delivered_alert
ON notification_logs (alert_id) WHERE status = 'DELIVERED';
"#,
    r#"
CREATE TABLE IF NOT EXISTS vehicles (
    id TEXT PRIMARY KEY,
    organization_id TEXT
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS refined_reports (
    fuel_log_id UUID PRIMARY KEY,
    vehicle_id TEXT NOT NULL,
    org_id TEXT,
    fuel_level DOUBLE PRECISION NOT NULL,
    fuel_drop_liters DOUBLE PRECISION NOT NULL,
    is_anomalous BOOLEAN NOT NULL,
    scorer TEXT NOT NULL,
    reported_at TIMESTAMPTZ NOT NULL
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS vehicle_fuel_summaries (
    vehicle_id TEXT PRIMARY KEY,
    org_id TEXT,
    readings_count BIGINT NOT NULL DEFAULT 0,
    anomalies_count BIGINT NOT NULL DEFAULT 0,
    total_drop_liters DOUBLE PRECISION NOT NULL DEFAULT 0,
    last_fuel_level DOUBLE PRECISION,
    last_reported_at TIMESTAMPTZ
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS queue_messages (
    id BIGSERIAL PRIMARY KEY,
    queue_name TEXT NOT NULL,
    body TEXT NOT NULL,
    receive_count INT NOT NULL DEFAULT 0,
    receipt_handle UUID,
    visible_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    enqueued_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_queue_messages_visible
ON queue_messages (queue_name, visible_at, id);
"#,
    r#"
CREATE TABLE IF NOT EXISTS dead_letters (
    id BIGSERIAL PRIMARY KEY,
    queue_name TEXT NOT NULL,
    body TEXT NOT NULL,
    reason TEXT NOT NULL,
    receive_count INT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
];
