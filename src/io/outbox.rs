//! Notification outbox output
//!
//! The binary does not deliver mail. Every notification a pass produces is written to
//! stdout as one CSV row with columns `recipients,template,payload`, where recipients
//! are `;`-separated and the payload is the structured data as JSON.

use crate::types::SentNotification;
use std::io::Write;

/// Write notifications to CSV in the order they were sent
///
/// # Arguments
///
/// * `notifications` - Notifications handed to the dispatcher
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a payload could not be encoded or a write error occurred
pub fn write_notifications_csv(
    notifications: &[SentNotification],
    output: &mut dyn Write,
) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["recipients", "template", "payload"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for notification in notifications {
        let payload = serde_json::to_string(&notification.data)
            .map_err(|e| format!("Failed to encode {} payload: {}", notification.template, e))?;
        writer
            .write_record([
                notification.recipients.join(";"),
                notification.template.to_string(),
                payload,
            ])
            .map_err(|e| format!("Failed to write notification record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
