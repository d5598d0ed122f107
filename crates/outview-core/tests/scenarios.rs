use outview_core::{
    build_control, check_result, parse_descriptor, ControlKind, DisplayType, InvocationAdapter,
    InvocationContext, InvocationError, OutputFile, OutputViewMetadata, OutviewConfig, ParamKind,
    ParamValue, ParameterField, ParameterSchema, ParameterUpdate, ProviderCatalog,
    ProviderRegistry, RequestContext, ViewPayload, ViewSession,
};
use serde_json::json;

#[test]
fn boolean_parameter_renders_as_checkbox() {
    let descriptor = parse_descriptor(&json!({"name": "show_grid", "value": false})).unwrap();
    assert_eq!(descriptor.kind, ParamKind::Boolean);
    assert_eq!(build_control(&descriptor).kind, ControlKind::Checkbox);
}

#[test]
fn bounded_integer_renders_as_slider_with_unit_step() {
    let descriptor =
        parse_descriptor(&json!({"name": "count", "value": 5, "min": 0, "max": 10})).unwrap();
    let control = build_control(&descriptor);
    assert_eq!(control.kind, ControlKind::RangeSlider);
    assert_eq!(control.step, Some(ParamValue::Int(1)));
}

#[test]
fn option_list_renders_as_select() {
    let descriptor = parse_descriptor(&json!({
        "name": "color",
        "value": "red",
        "options": ["red", "green", "blue"]
    }))
    .unwrap();
    let control = build_control(&descriptor);
    assert_eq!(control.kind, ControlKind::Select);
    assert_eq!(control.options.len(), 3);
    assert_eq!(control.value, ParamValue::from("red"));
}

#[test]
fn unknown_parameter_update_leaves_state_unchanged() {
    let adapter = InvocationAdapter::new(
        ParameterSchema::new(vec![
            ParameterField::new("show_grid", false),
            ParameterField::new("count", 5i64),
        ])
        .unwrap(),
    );
    let state = adapter.initial_state();
    let snapshot = state.clone();

    let err = adapter
        .apply(Some(&state), &ParameterUpdate::single("bogus", 1i64))
        .unwrap_err();

    assert_eq!(err, InvocationError::UnknownParameter { name: "bogus".into() });
    assert_eq!(state, snapshot);
}

#[test]
fn custom_provider_listed_first_is_initial_and_default_is_fallback() {
    let config = OutviewConfig::from_yaml(
        r#"
portal_base_url: "https://portal.example.org"
entry_points:
  airavata.output_view_providers:
    custom: "outview.providers:TextPreviewProvider"
"#,
    )
    .unwrap();
    let registry = ProviderRegistry::from_config(&config, &ProviderCatalog::builtin()).unwrap();

    let selection =
        OutputViewMetadata::parse(r#"{"output-view-providers": ["custom", "default"]}"#)
            .resolve(&registry);
    assert_eq!(selection.initial(), "custom");
    assert_eq!(selection.fallback(), "default");

    let context = InvocationContext {
        request: RequestContext {
            username: Some("alice".into()),
            portal_base_url: config.portal_base_url.clone(),
        },
        output_field: "stdout".into(),
        experiment_id: "exp-7".into(),
        output_file: Some(OutputFile::new("stdout.txt", "airavata-dp://7", "hello\nworld")),
    };

    let mut initial = ViewSession::from_registry(&registry, selection.initial(), context.clone()).unwrap();
    let view = initial.render().unwrap();
    assert!(matches!(view.payload, Some(ViewPayload::Html { .. })));

    let mut fallback = ViewSession::from_registry(&registry, selection.fallback(), context).unwrap();
    let view = fallback.render().unwrap();
    match view.payload.as_ref().unwrap() {
        ViewPayload::Link { url, label } => {
            assert!(url.starts_with("https://portal.example.org/sdk/download/?data-product-uri="));
            assert_eq!(label, "stdout.txt");
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn full_result_round_through_the_host() {
    let raw = json!({
        "image": "iVBORw==",
        "mime-type": "image/png",
        "interactive": [
            {"name": "dpi", "value": 72, "options": [[ "Low", 72 ], [ "High", 300 ]]},
            {"name": "alpha", "value": 0.5, "min": 0, "max": 1, "help": "Opacity"},
            {"name": "title", "value": "Energy"}
        ]
    });
    let checked = check_result(DisplayType::Image, &raw).unwrap();
    let kinds: Vec<_> = checked.controls.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![ControlKind::Select, ControlKind::RangeSlider, ControlKind::TextInput]
    );
    assert_eq!(checked.controls[0].options[1], ("High".to_string(), ParamValue::Int(300)));
    assert!(checked.controls[1].step.is_none());
}
