use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

const KST_OFFSET_SECS: i32 = 9 * 3600;

fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// 毫秒时间戳转为韩国时间字符串（UTC+9）
pub fn mill_time_to_datetime_kst(timestamp_ms: i64) -> Result<String, String> {
    match Utc.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(datetime) => Ok(datetime
            .with_timezone(&kst())
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()),
        chrono::LocalResult::None => Err("Invalid timestamp: None".to_string()),
        chrono::LocalResult::Ambiguous(_, _) => Err("Invalid timestamp: Ambiguous".to_string()),
    }
}

/// 解析交易所返回的 KST 本地时间，如 `2024-05-01T13:00:00`
pub fn kst_str_to_millis(value: &str) -> anyhow::Result<i64> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| anyhow::anyhow!("无法解析时间 {}: {}", value, e))?;
    let local: DateTime<FixedOffset> = kst()
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| anyhow::anyhow!("无法解析时间 {}", value))?;
    Ok(local.timestamp_millis())
}

pub fn now_kst_string() -> String {
    Utc::now()
        .with_timezone(&kst())
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
