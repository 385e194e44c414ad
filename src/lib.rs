pub mod expr;
pub mod form;
pub mod i18n;
pub mod markup;
pub mod prelude;

pub use i18n::{I18nManager, Locale};
