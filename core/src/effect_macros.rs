//! Declarative macros for ergonomic effect construction.

/// Create an [`Effect::EventStore`](crate::effect::Effect) append operation.
///
/// ```rust,ignore
/// append_events! {
///     store: env.event_store,
///     stream: env.stream_id.as_str(),
///     expected_version: None,
///     events: vec![serialized],
///     on_success: |_version| None,
///     on_error: |error| Some(BookingAction::InfrastructureFailed { error: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! append_events {
    (
        store: $store:expr,
        stream: $stream:expr,
        expected_version: $expected:expr,
        events: $events:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::EventStore($crate::effect::EventStoreOperation::AppendEvents {
            event_store: ::std::sync::Arc::clone(&$store),
            stream_id: $crate::stream::StreamId::new($stream),
            expected_version: $expected,
            events: $events,
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an [`Effect::PublishEvent`](crate::effect::Effect) operation.
///
/// ```rust,ignore
/// publish_event! {
///     bus: env.event_bus,
///     topic: "ledger",
///     event: serialized,
///     on_success: || None,
///     on_error: |error| Some(BookingAction::InfrastructureFailed { error: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! publish_event {
    (
        bus: $bus:expr,
        topic: $topic:expr,
        event: $event:expr,
        on_success: || $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::PublishEvent($crate::effect::EventBusOperation::Publish {
            event_bus: ::std::sync::Arc::clone(&$bus),
            topic: $topic.to_string(),
            event: $event,
            on_success: ::std::boxed::Box::new(move |()| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an [`Effect::Future`](crate::effect::Effect) from an async block.
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(::std::boxed::Box::pin(async move { $($body)* }))
    };
}

/// Create an [`Effect::Delay`](crate::effect::Effect) for scheduled actions.
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
