use std::any::Any;

use super::tracker::EntityId;

/// Text of a caught panic payload (`&str` or `String`), or a placeholder.
pub fn panic_payload_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Logs a panic caught while processing one character.
pub fn log_character_panic(entity: EntityId, payload: &(dyn Any + Send)) {
    let message = panic_payload_message(payload);
    tracing::error!(
        entity = %entity,
        panic = %message,
        "slide correction panicked; character skipped this tick"
    );
}
