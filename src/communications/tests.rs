use super::*;

fn fields(name: &str, can_id: &str) -> CanMessageFields {
    CanMessageFields {
        name: name.to_string(),
        value: 42,
        position: 0,
        status: MessageStatus::On,
        direction: Direction::Send,
        can_id: can_id.to_string(),
        length: 8,
        data_raw: "01 02 03 04 05 06 07 08".to_string(),
        cycle_time: 50,
    }
}

#[test]
fn test_sample_messages_are_valid() {
    let messages = sample_messages();
    assert_eq!(messages.len(), 6);
    for message in &messages {
        message.fields.validate().unwrap();
    }
}

#[test]
fn test_parse_can_id() {
    assert_eq!(parse_can_id("123H").unwrap(), 0x123);
    assert_eq!(parse_can_id("1FFFFFFFH").unwrap(), MAX_CAN_ID);
    assert!(parse_can_id("123").is_err());
    assert!(parse_can_id("H").is_err());
    assert!(parse_can_id("12GH").is_err());
    assert!(parse_can_id("20000000H").is_err());
    assert!(parse_can_id("-1H").is_err());
}

#[test]
fn test_parse_data_raw() {
    assert_eq!(parse_data_raw("14 11 AA").unwrap(), vec![0x14, 0x11, 0xAA]);
    assert!(parse_data_raw("").is_err());
    assert!(parse_data_raw("1 22").is_err());
    assert!(parse_data_raw("ZZ").is_err());
    assert!(parse_data_raw("+1").is_err());
}

#[test]
fn test_field_validation() {
    let mut message = fields("Msg", "123H");
    message.length = 9;
    assert!(matches!(
        message.validate(),
        Err(CommunicationsError::Invalid { field: "length", .. })
    ));

    let mut message = fields("Msg", "123H");
    message.cycle_time = 0;
    assert!(matches!(
        message.validate(),
        Err(CommunicationsError::Invalid {
            field: "cycle_time",
            ..
        })
    ));

    assert!(fields("  ", "123H").validate().is_err());
}

#[test]
fn test_message_wire_shape() {
    let message = &sample_messages()[1];
    let json = serde_json::to_value(message).unwrap();

    assert_eq!(json["id"], 2);
    assert_eq!(json["direction"], "RECEIVE");
    assert_eq!(json["status"], "ON");
    assert_eq!(json["can_id"], "111H");
}

#[test]
fn test_settings_validation() {
    CanSettings::default().validate().unwrap();

    let settings = CanSettings {
        port: "COM256".to_string(),
        clock: "20MHz".to_string(),
        bit_rate: 1000,
        ..CanSettings::default()
    };
    settings.validate().unwrap();

    for port in ["COM0", "COM257", "LPT1", "COM"] {
        let settings = CanSettings {
            port: port.to_string(),
            ..CanSettings::default()
        };
        assert!(settings.validate().is_err(), "{}", port);
    }

    let settings = CanSettings {
        bit_rate: 300,
        ..CanSettings::default()
    };
    assert!(settings.validate().is_err());
}

#[tokio::test]
async fn test_list_filters_by_name() {
    let store = CommunicationsStore::seeded();

    assert_eq!(store.list(None).await.len(), 6);
    let rx = store.list(Some("rx")).await;
    assert_eq!(rx.len(), 2);
    assert!(rx.iter().all(|m| m.fields.name.contains("RX")));
}

#[tokio::test]
async fn test_create_assigns_next_id() {
    let store = CommunicationsStore::seeded();

    let message = store.create(fields("Msg_TX_08", "7FFH")).await.unwrap();
    assert_eq!(message.id, 7);

    store.delete(7).await.unwrap();
    let message = store.create(fields("Msg_TX_09", "7FFH")).await.unwrap();
    assert_eq!(message.id, 7);
}

#[tokio::test]
async fn test_create_rejects_invalid() {
    let store = CommunicationsStore::new();
    assert!(store.create(fields("Msg", "XYZ")).await.is_err());
    assert!(store.list(None).await.is_empty());
}

#[tokio::test]
async fn test_toggle_direction() {
    let store = CommunicationsStore::seeded();

    let message = store.toggle_direction(1).await.unwrap();
    assert_eq!(message.fields.direction, Direction::Receive);
    let message = store.toggle_direction(1).await.unwrap();
    assert_eq!(message.fields.direction, Direction::Send);

    assert_eq!(
        store.toggle_direction(99).await,
        Err(CommunicationsError::NotFound(99))
    );
}

#[tokio::test]
async fn test_delete_unknown() {
    let store = CommunicationsStore::seeded();
    assert_eq!(store.delete(42).await, Err(CommunicationsError::NotFound(42)));
}

#[tokio::test]
async fn test_update_settings() {
    let store = CommunicationsStore::seeded();
    let settings = CanSettings {
        com_enabled: true,
        port: "COM19".to_string(),
        ..CanSettings::default()
    };

    store.update_settings(settings.clone()).await.unwrap();
    assert_eq!(store.settings().await, settings);

    let invalid = CanSettings {
        clock: "12MHz".to_string(),
        ..CanSettings::default()
    };
    assert!(store.update_settings(invalid).await.is_err());
    assert_eq!(store.settings().await, settings);
}
