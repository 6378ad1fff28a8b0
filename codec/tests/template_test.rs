//! Integration tests for template-driven deserialization.

use bitwire_codec::{
    Config, Count, DataType, Deserializer, Error, MessageTemplate, RangeCfg, Vle8_16,
};
use std::sync::Arc;

/// Packs `(value, bits)` pairs LSB-first.
fn pack(fields: &[(u64, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut used = 0;
    for &(value, bits) in fields {
        for i in 0..bits {
            if used == 0 {
                out.push(0u8);
            }
            if (value >> i) & 1 == 1 {
                *out.last_mut().unwrap() |= 1 << used;
            }
            used = (used + 1) % 8;
        }
    }
    out
}

/// `seq: u32`, `alive: bit`, `hits: u16 x dyn(4)`, `pos: {x: s16, y: s16} x 2`, `tag: s8 x dyn(8)`
fn player_template() -> MessageTemplate {
    let mut template = MessageTemplate::new(42, "PlayerState").with_reliable(true);
    template
        .add_field(None, "seq", DataType::U32, Count::Fixed(1))
        .unwrap();
    template
        .add_field(None, "alive", DataType::Bit, Count::Fixed(1))
        .unwrap();
    template
        .add_field(None, "hits", DataType::U16, Count::Dynamic { bits: 4 })
        .unwrap();
    let pos = template
        .add_struct(None, "pos", Count::Fixed(2))
        .unwrap();
    template
        .add_field(Some(pos), "x", DataType::S16, Count::Fixed(1))
        .unwrap();
    template
        .add_field(Some(pos), "y", DataType::S16, Count::Fixed(1))
        .unwrap();
    template
        .add_field(None, "tag", DataType::S8, Count::Dynamic { bits: 8 })
        .unwrap();
    template
}

fn player_message(hits: &[u16], tag: &[u8]) -> Vec<u8> {
    let mut fields = vec![(77, 32), (1, 1), (hits.len() as u64, 4)];
    fields.extend(hits.iter().map(|&hit| (u64::from(hit), 16)));
    for value in [-5i16, 6, 300, -301] {
        fields.push((u64::from(value as u16), 16));
    }
    fields.push((tag.len() as u64, 8));
    fields.extend(tag.iter().map(|&byte| (u64::from(byte), 8)));
    pack(&fields)
}

fn read_player(deserializer: &mut Deserializer<'_>) -> Result<(u32, bool, Vec<u16>, [i16; 4], String), Error> {
    let seq = deserializer.read::<u32>()?;
    let alive = deserializer.read::<bool>()?;
    let count = deserializer.dynamic_count()?;
    let hits = deserializer.read_vec::<u16>(count as usize)?;
    let mut pos = [0i16; 4];
    deserializer.read_array(&mut pos)?;
    let tag = deserializer.read_string()?;
    Ok((seq, alive, hits, pos, tag))
}

#[test]
fn test_full_message() {
    let template = player_template();
    let data = player_message(&[10, 20, 30], b"ace");
    let mut deserializer = Deserializer::with_template(&data, &template);

    let (seq, alive, hits, pos, tag) = read_player(&mut deserializer).unwrap();
    assert_eq!(seq, 77);
    assert!(alive);
    assert_eq!(hits, vec![10, 20, 30]);
    assert_eq!(pos, [-5, 6, 300, -301]);
    assert_eq!(tag, "ace");
    assert!(deserializer.is_complete());
    assert!(deserializer.bits_left() < 8);
}

#[test]
fn test_zero_length_dynamic_array() {
    let template = player_template();
    let data = player_message(&[], b"");
    let mut deserializer = Deserializer::with_template(&data, &template);

    deserializer.read::<u32>().unwrap();
    deserializer.read::<bool>().unwrap();
    let before = deserializer.bits_left();
    assert_eq!(deserializer.dynamic_count().unwrap(), 0);
    assert_eq!(before - deserializer.bits_left(), 4);

    // No element bits consumed, and the template moves exactly one field ahead
    deserializer.read_array::<u16>(&mut []).unwrap();
    assert_eq!(before - deserializer.bits_left(), 4);
    let walker = deserializer.walker().unwrap();
    assert_eq!(walker.next_field().unwrap().name(), "x");
    assert_eq!(walker.next_type(), Some(DataType::S16));

    let mut pos = [0i16; 4];
    deserializer.read_array(&mut pos).unwrap();
    assert_eq!(deserializer.read_string().unwrap(), "");
    assert!(deserializer.is_complete());
}

#[test]
fn test_zero_length_requires_empty_field() {
    let template = player_template();
    let data = player_message(&[1], b"");
    let mut deserializer = Deserializer::with_template(&data, &template);
    assert!(matches!(
        deserializer.read_array::<u32>(&mut []),
        Err(Error::NotEmpty(_))
    ));
    assert_eq!(deserializer.byte_pos(), 0);
}

#[test]
fn test_type_mismatch_consumes_nothing() {
    let template = player_template();
    let data = player_message(&[], b"");
    let mut deserializer = Deserializer::with_template(&data, &template);

    assert_eq!(
        deserializer.read::<i32>(),
        Err(Error::SchemaMismatch(DataType::U32, DataType::S32))
    );
    assert_eq!(
        deserializer.read::<bool>(),
        Err(Error::SchemaMismatch(DataType::U32, DataType::Bit))
    );
    assert_eq!(deserializer.bits_left(), data.len() * 8);
    assert_eq!(deserializer.read::<u32>().unwrap(), 77);
}

#[test]
fn test_dynamic_field_requires_count() {
    let template = player_template();
    let data = player_message(&[9], b"");
    let mut deserializer = Deserializer::with_template(&data, &template);
    deserializer.read::<u32>().unwrap();

    // Count read out of order
    assert!(matches!(
        deserializer.dynamic_count(),
        Err(Error::NotDynamic(_))
    ));
    deserializer.read::<bool>().unwrap();
    assert!(matches!(
        deserializer.read::<u16>(),
        Err(Error::DynamicCountRequired(_))
    ));
    assert_eq!(deserializer.dynamic_count().unwrap(), 1);
    assert_eq!(deserializer.read::<u16>().unwrap(), 9);
}

#[test]
fn test_read_past_template() {
    let mut template = MessageTemplate::new(1, "Short");
    template
        .add_field(None, "a", DataType::U8, Count::Fixed(1))
        .unwrap();
    let data = [1, 2, 3];
    let mut deserializer = Deserializer::with_template(&data, &template);
    assert_eq!(deserializer.read::<u8>().unwrap(), 1);
    assert_eq!(deserializer.read::<u8>(), Err(Error::SchemaExhausted));
    assert_eq!(deserializer.read_string(), Err(Error::SchemaExhausted));
    assert_eq!(deserializer.bytes_left(), 2);

    // Raw reads bypass the template
    assert_eq!(deserializer.read_bits(8).unwrap(), 2);
    assert_eq!(deserializer.read_vle::<Vle8_16>().unwrap(), 3);
}

#[test]
fn test_truncated_message() {
    let template = player_template();
    let data = player_message(&[1, 2, 3], b"ace");
    let truncated = &data[..data.len() - 2];
    let mut deserializer = Deserializer::with_template(truncated, &template);
    assert_eq!(
        read_player(&mut deserializer).unwrap_err(),
        Error::EndOfBuffer
    );
    assert!(!deserializer.is_complete());
}

#[test]
fn test_fixed_string_field() {
    let mut template = MessageTemplate::new(5, "Named");
    template
        .add_field(None, "name", DataType::U8, Count::Fixed(4))
        .unwrap();
    template
        .add_field(None, "ok", DataType::Bit, Count::Fixed(1))
        .unwrap();
    let data = [b'a', 0x01, b'\t', 0xFF, 0x01];
    let mut deserializer = Deserializer::with_template(&data, &template);
    assert_eq!(deserializer.read_string().unwrap(), "a \t ");
    assert!(deserializer.read::<bool>().unwrap());
    assert!(deserializer.is_complete());
}

#[test]
fn test_string_on_non_char_field() {
    let template = player_template();
    let data = player_message(&[], b"");
    let mut deserializer = Deserializer::with_template(&data, &template);
    assert!(matches!(
        deserializer.read_string(),
        Err(Error::NotString(_))
    ));
}

#[test]
fn test_dynamic_count_limit() {
    let template = player_template();
    let data = player_message(&[1, 2, 3, 4, 5], b"");
    let cfg = Config {
        dynamic_count: RangeCfg::new(..=4),
        ..Default::default()
    };
    let mut deserializer = Deserializer::with_config(&data, Some(&template), cfg);
    deserializer.read::<u32>().unwrap();
    deserializer.read::<bool>().unwrap();
    assert_eq!(deserializer.dynamic_count(), Err(Error::InvalidLength(5)));
}

#[test]
fn test_shared_template_across_threads() {
    let template = Arc::new(player_template());
    let messages: Vec<Vec<u8>> = (0..4u16)
        .map(|i| player_message(&vec![i; i as usize], b"go"))
        .collect();

    std::thread::scope(|scope| {
        for (i, message) in messages.iter().enumerate() {
            let template = Arc::clone(&template);
            scope.spawn(move || {
                let mut deserializer = Deserializer::with_template(message, &template);
                let (_, _, hits, _, tag) = read_player(&mut deserializer).unwrap();
                assert_eq!(hits, vec![i as u16; i]);
                assert_eq!(tag, "go");
                assert!(deserializer.is_complete());
            });
        }
    });
}

#[test]
fn test_truncated_string_consumes_nothing() {
    let template = player_template();
    let data = player_message(&[], b"ace");
    let truncated = &data[..data.len() - 1];
    let mut deserializer = Deserializer::with_template(truncated, &template);
    deserializer.read::<u32>().unwrap();
    deserializer.read::<bool>().unwrap();
    deserializer.dynamic_count().unwrap();
    deserializer.read_array::<u16>(&mut []).unwrap();
    let mut pos = [0i16; 4];
    deserializer.read_array(&mut pos).unwrap();

    let before = deserializer.bits_left();
    assert_eq!(deserializer.read_string(), Err(Error::EndOfBuffer));
    assert_eq!(deserializer.bits_left(), before);
    assert!(deserializer.walker().unwrap().is_pending());
}

#[test]
fn test_hollow_struct_with_huge_count() {
    let mut template = MessageTemplate::new(9, "Padding");
    let outer = template
        .add_struct(None, "outer", Count::Dynamic { bits: 32 })
        .unwrap();
    template
        .add_struct(Some(outer), "inner", Count::Fixed(0))
        .unwrap();
    template
        .add_field(None, "tail", DataType::U8, Count::Fixed(1))
        .unwrap();

    let data = pack(&[(u64::from(u32::MAX), 32), (0xA5, 8)]);
    let mut deserializer = Deserializer::with_template(&data, &template);
    assert_eq!(deserializer.dynamic_count().unwrap(), u32::MAX);
    assert_eq!(deserializer.read::<u8>().unwrap(), 0xA5);
    assert!(deserializer.is_complete());
}
