use calmform::expr::Expressions;
use calmform::form::{ErrorKind, FieldState, FormController, FormOptions};
use calmform::markup::{Document, Markup};
use proptest::prelude::*;
use serde_json::json;

fn build(values: &[String]) -> (Document, FormController<Expressions>) {
    let mut doc = Document::new();
    let root = doc.root();
    let form = doc.append_element(root, "form", &[]);
    let group = doc.append_element(form, "div", &[("class", "group")]);
    let names = (0..values.len())
        .map(|index| format!("field{index}"))
        .collect::<Vec<_>>();
    for name in &names {
        let row = doc.append_element(group, "div", &[]);
        doc.append_element(
            row,
            "input",
            &[
                ("name", name.as_str()),
                ("validator", "has_at"),
                ("validator-group", "group"),
                ("validator-group-elements", "input"),
            ],
        );
    }

    let evaluator = Expressions::new().define("has_at", |scope| json!(scope.value().contains('@')));
    let options = FormOptions {
        locale: "en".into(),
        ..FormOptions::default()
    };
    let mut controller = FormController::attach(&doc, form, evaluator, options).expect("attach");
    for (name, value) in names.iter().zip(values) {
        let mut field = FieldState::new(value.clone());
        field.set_validity(ErrorKind::Required, !value.is_empty());
        controller
            .state_mut()
            .bind(name.clone(), field)
            .expect("bind");
    }
    (doc, controller)
}

proptest! {
    #[test]
    fn ticks_converge_and_never_duplicate_annotations(
        values in prop::collection::vec("[a-z@]{0,6}", 1..5),
        submit in any::<bool>(),
    ) {
        let (mut doc, mut controller) = build(&values);
        if submit {
            controller.submit(&mut doc).expect("submit");
        } else {
            controller.tick(&mut doc).expect("tick");
        }
        let rendered = doc.to_markup(controller.form());

        let report = controller.tick(&mut doc).expect("tick");
        prop_assert_eq!(report.reconciled, 0);
        prop_assert_eq!(doc.to_markup(controller.form()), rendered);

        let annotations = doc.query(".validationMessage").expect("selector");
        let invalid = controller
            .state()
            .fields()
            .filter(|(_, field)| field.is_invalid())
            .count();
        if submit {
            prop_assert_eq!(annotations.len(), invalid);
        } else {
            prop_assert!(annotations.is_empty());
        }

        let group = doc.query(".group").expect("selector")[0];
        prop_assert_eq!(doc.has_class(group, "has-error"), submit && invalid > 0);
    }
}
