pub use crate::expr::{Evaluator, Expressions, Scope};
pub use crate::form::{
    ErrorKind, FieldKey, FieldState, FormController, FormError, FormOptions, FormResult,
    FormSchema, FormSchemaSource, FormState, SubmitOutcome, TickReport,
};
pub use crate::markup::{Document, Markup, NodeId, Selector};
pub use crate::{I18nManager, Locale};
