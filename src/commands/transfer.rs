use std::path::Path;

use crate::{notifications::NotificationKind, transfer, Data};

#[tracing::instrument(skip(data))]
pub async fn export(data: &Data, path: &str) -> anyhow::Result<String> {
    let count = transfer::export_to(&data.store, Path::new(path)).await?;

    Ok(format!("exported {count} quote(s) to {path}."))
}

/// Imports a file and reports the outcome as a notification.
#[tracing::instrument(skip(data))]
pub async fn import(data: &Data, path: &str) {
    match transfer::import_from(&data.store, Path::new(path)).await {
        Ok(report) => {
            data.notifier.notify(
                NotificationKind::Success,
                format!("Quotes imported successfully! {report}."),
            );
        }
        Err(e) => {
            tracing::warn!(err = %e, "import failed");
            data.notifier
                .notify(NotificationKind::Error, format!("Import failed: {e}"));
        }
    }
}
