use calmform::form::FormSchemaSource;

#[allow(dead_code)]
#[derive(Clone, calmform::form::FormSchema)]
#[validator(submit = "save()")]
struct SignupForm {
    #[validator(validator = "email_has_at", invalid_message = "'Bad email'")]
    email: String,
    #[validator(name = "billing-zip", group = "billing", required_message = "'Zip needed'")]
    zip: String,
    notes: String,
}

fn main() {
    let fields = SignupForm::fields();
    assert_eq!(fields.email().as_str(), "email");
    assert_eq!(fields.zip().as_str(), "billing-zip");
    assert_eq!(fields.notes().as_str(), "notes");

    let schema = SignupForm::form_schema();
    assert_eq!(schema.submit.as_deref(), Some("save()"));
    assert_eq!(schema.fields.len(), 2);

    let email = schema.field("email").expect("email configured");
    assert_eq!(email.validator.as_deref(), Some("email_has_at"));
    assert_eq!(email.invalid_message.as_deref(), Some("'Bad email'"));

    let zip = schema.field("billing-zip").expect("zip configured");
    assert_eq!(zip.group.as_deref(), Some("billing"));
    assert!(schema.field("notes").is_none());
}
