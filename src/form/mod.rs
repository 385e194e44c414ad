mod class;
mod config;
mod context;
mod controller;
mod error;
mod message;
mod registry;
mod schema;
mod state;
mod validation;


pub use calmform_derive::FormSchema;
pub use class::{ClassMarks, ClassOutcome, reconcile_classes};
pub use config::{FieldConfig, FormOptions, RawFieldConfig, SUBMIT_ATTRIBUTE};
pub use context::ReconcileContext;
pub use controller::{FormController, FormId, SubmitOutcome, TickReport};
pub use error::{FormError, FormResult};
pub use message::{
    ANNOTATION_OWNER_ATTRIBUTE, INVALID_MESSAGE_KEY, MessageOutcome, REQUIRED_MESSAGE_KEY,
    reconcile_message,
};
pub use registry::{FieldRef, FieldRegistry, Fingerprint, Subscription, SubscriptionId};
pub use schema::{FormSchema, FormSchemaSource};
pub use state::{ErrorKind, FieldKey, FieldState, FormState};
pub use validation::{Validity, evaluate_validity};
