//! Call Notification API Library
//!
//! This library provides the core functionality for the call notification
//! service: normalizing call-completion webhooks from multiple voice-agent
//! providers, resolving notification recipients from a contact directory,
//! rendering call summaries, and dispatching them by email.
//!
//! # Modules
//!
//! - `call_api`: Call platform detail API client.
//! - `call_models`: Webhook payload shapes and the canonical call record.
//! - `config`: Configuration management.
//! - `contacts`: Contact directory loading and recipient resolution.
//! - `errors`: Error handling types.
//! - `handlers`: Shared application state, health endpoint, and router.
//! - `mailer`: OAuth2-authenticated SMTP mail dispatcher.
//! - `report`: Plain-text / HTML call summary rendering.
//! - `webhook_handler`: Webhook endpoints for both providers.

pub mod call_api;
pub mod call_models;
pub mod config;
pub mod contacts;
pub mod errors;
pub mod handlers;
pub mod mailer;
pub mod report;
pub mod webhook_handler;
