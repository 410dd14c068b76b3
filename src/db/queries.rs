pub const INSERT_FUEL_LOG: &str = r#"
INSERT INTO fuel_logs (id, sensor_id, vehicle_id, user_id, fuel_level, latitude, longitude, recorded_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
RETURNING id, sensor_id, vehicle_id, user_id, fuel_level, latitude, longitude, recorded_at;
"#;

pub const INSERT_THEFT_ALERT_IF_ABSENT: &str = r#"
INSERT INTO theft_alerts (id, fuel_log_id, vehicle_id, user_id, status, description, created_at)
VALUES ($1, $2, $3, $4, 'PENDING', $5, NOW())
ON CONFLICT (fuel_log_id) DO NOTHING
RETURNING id, fuel_log_id, vehicle_id, user_id, status, description, created_at;
"#;

pub const SELECT_THEFT_ALERT_BY_FUEL_LOG: &str = r#"
SELECT id, fuel_log_id, vehicle_id, user_id, status, description, created_at
FROM theft_alerts WHERE fuel_log_id = $1;
"#;

pub const SELECT_THEFT_ALERT: &str = r#"
SELECT id, fuel_log_id, vehicle_id, user_id, status, description, created_at
FROM theft_alerts WHERE id = $1;
"#;

pub const UPDATE_THEFT_ALERT_STATUS: &str = r#"
UPDATE theft_alerts
SET status = $3
WHERE id = $1 AND status = $2
RETURNING id, fuel_log_id, vehicle_id, user_id, status, description, created_at;
"#;

pub const SELECT_DELIVERED_NOTIFICATION: &str = r#"
SELECT id, alert_id, user_id, message, status, created_at
FROM notification_logs WHERE alert_id = $1 AND status = 'DELIVERED';
"#;

pub const INSERT_DELIVERED_NOTIFICATION: &str = r#"
INSERT INTO notification_logs (id, alert_id, user_id, message, status, created_at)
VALUES ($1, $2, $3, $4, 'DELIVERED', NOW())
ON CONFLICT (alert_id) WHERE status = 'DELIVERED' DO NOTHING
RETURNING id, alert_id, user_id, message, status, created_at;
"#;

pub const INSERT_REFINED_REPORT: &str = r#"
INSERT INTO refined_reports (
    fuel_log_id, vehicle_id, org_id, fuel_level, fuel_drop_liters, is_anomalous, scorer, reported_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (fuel_log_id) DO NOTHING;
"#;

pub const UPSERT_VEHICLE_FUEL_SUMMARY: &str = r#"
INSERT INTO vehicle_fuel_summaries (
    vehicle_id, org_id, readings_count, anomalies_count, total_drop_liters, last_fuel_level, last_reported_at
) VALUES ($1, $2, 1, $3, $4, $5, $6)
ON CONFLICT (vehicle_id) DO UPDATE
SET org_id = COALESCE(EXCLUDED.org_id, vehicle_fuel_summaries.org_id),
    readings_count = vehicle_fuel_summaries.readings_count + 1,
    anomalies_count = vehicle_fuel_summaries.anomalies_count + EXCLUDED.anomalies_count,
    total_drop_liters = vehicle_fuel_summaries.total_drop_liters + EXCLUDED.total_drop_liters,
    last_fuel_level = CASE
        WHEN vehicle_fuel_summaries.last_reported_at IS NULL
          OR EXCLUDED.last_reported_at >= vehicle_fuel_summaries.last_reported_at
        THEN EXCLUDED.last_fuel_level
        ELSE vehicle_fuel_summaries.last_fuel_level
    END,
    last_reported_at = GREATEST(vehicle_fuel_summaries.last_reported_at, EXCLUDED.last_reported_at);
"#;

pub const SELECT_VEHICLE_ORGANIZATION: &str = r#"
SELECT organization_id FROM vehicles WHERE id = $1;
"#;

pub const INSERT_DEAD_LETTER: &str = r#"
INSERT INTO dead_letters (queue_name, body, reason, receive_count, created_at)
VALUES ($1, $2, $3, $4, NOW());
"#;

pub const ENQUEUE_MESSAGE: &str = r#"
INSERT INTO queue_messages (queue_name, body, receive_count, visible_at, enqueued_at)
VALUES ($1, $2, 0, NOW(), NOW())
RETURNING id;
"#;

// SKIP LOCKED lets competing consumers claim disjoint rows.
pub const CLAIM_MESSAGES: &str = r#"
UPDATE queue_messages
SET visible_at = NOW() + make_interval(secs => $3),
    receive_count = receive_count + 1,
    receipt_handle = gen_random_uuid()
WHERE id IN (
    SELECT id FROM queue_messages
    WHERE queue_name = $1 AND visible_at <= NOW()
    ORDER BY id
    LIMIT $2
    FOR UPDATE SKIP LOCKED
)
RETURNING id, body, receive_count, receipt_handle, enqueued_at;
"#;

pub const DELETE_MESSAGE: &str = r#"
DELETE FROM queue_messages WHERE queue_name = $1 AND receipt_handle = $2;
"#;

pub const EXTEND_MESSAGE_VISIBILITY: &str = r#"
UPDATE queue_messages
SET visible_at = NOW() + make_interval(secs => $3)
WHERE queue_name = $1 AND receipt_handle = $2;
"#;
