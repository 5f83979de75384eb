use warden_core::{
    Category, CategoryFamily, CategoryRegistry, ConfigurationKind, Diagnostic, Error,
    PermissionState, Resolution, Status,
};

#[test]
fn test_persisted_codes_never_change() {
    let codes: Vec<u32> = Category::ALL.iter().map(|c| c.code()).collect();
    assert_eq!(
        codes,
        vec![
            1000, 2000, 3100, 3200, 4000, 5000, 5100, 6100, 6200, 7100, 7110, 7120, 7130, 8100,
            8200, 8250
        ]
    );
}

#[test]
fn test_every_category_parses_from_its_code_and_name() {
    for category in Category::ALL {
        assert_eq!(category.code().to_string().parse::<Category>().unwrap(), category);
        assert_eq!(category.name().parse::<Category>().unwrap(), category);
        assert!(!category.display_name().is_empty());
    }

    assert!(matches!(
        "3300".parse::<Category>(),
        Err(Error::UnknownCategory(_))
    ));
    assert!(matches!(
        "bluetooth".parse::<Category>(),
        Err(Error::UnknownCategory(_))
    ));
}

#[test]
fn test_metadata() {
    assert!(Category::Health.info().allows_repeated_prompting);
    assert!(!Category::Health.info().supports_silent_query);
    assert!(Category::SocialFacebook.info().requires_preconfiguration);
    assert!(!Category::SocialTwitter.info().requires_preconfiguration);
    assert_eq!(
        Category::NotificationLocal.info().configuration,
        Some(ConfigurationKind::Notifications)
    );
    assert_eq!(Category::Reminders.family(), CategoryFamily::Calendar);
    assert_eq!(Category::Microphone.info().configuration, None);
}

#[test]
fn test_registry_subset() {
    let registry = CategoryRegistry::with_categories([Category::Events, Category::Reminders]);

    assert_eq!(registry.len(), 2);
    assert!(registry.lookup(Category::Events).is_ok());
    assert!(matches!(
        registry.lookup(Category::Microphone),
        Err(Error::UnknownCategory(_))
    ));
    assert_eq!(
        registry.families().into_iter().collect::<Vec<_>>(),
        vec![CategoryFamily::Calendar]
    );
}

#[test]
fn test_wire_format() {
    let state = PermissionState::new(Category::LocationWhenInUse, Status::NotDetermined);
    assert_eq!(
        serde_json::to_string(&state).unwrap(),
        r#"{"category":3200,"status":"not_determined"}"#
    );

    let resolution = Resolution::failed(Category::Events, Diagnostic::PlatformTimeout { after_ms: 60000 });
    let json = serde_json::to_value(&resolution).unwrap();
    assert_eq!(json["category"], 8200);
    assert_eq!(json["status"], "denied");
    assert_eq!(json["diagnostic"]["kind"], "platform_timeout");
    assert_eq!(json["diagnostic"]["after_ms"], 60000);

    let parsed: PermissionState =
        serde_json::from_str(r#"{"category":"microphone","status":"authorized"}"#).unwrap();
    assert!(parsed.is_authorized());
}
