#![no_main]

use arbitrary::Arbitrary;
use bitwire_codec::{
    Config, Count, DataType, Deserializer, Error, FieldId, MessageTemplate, RangeCfg, Vle,
    Vle16_32, Vle8_16, Vle8_16_32, Vle8_32,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzType {
    Bit,
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    U64,
    S64,
    F32,
    F64,
}

impl From<FuzzType> for DataType {
    fn from(ty: FuzzType) -> Self {
        match ty {
            FuzzType::Bit => DataType::Bit,
            FuzzType::U8 => DataType::U8,
            FuzzType::S8 => DataType::S8,
            FuzzType::U16 => DataType::U16,
            FuzzType::S16 => DataType::S16,
            FuzzType::U32 => DataType::U32,
            FuzzType::S32 => DataType::S32,
            FuzzType::U64 => DataType::U64,
            FuzzType::S64 => DataType::S64,
            FuzzType::F32 => DataType::F32,
            FuzzType::F64 => DataType::F64,
        }
    }
}

#[derive(Arbitrary, Debug)]
enum FuzzCount {
    Fixed(u8),
    Dynamic(u8),
}

#[derive(Arbitrary, Debug)]
struct FuzzField {
    parent: Option<u8>,
    ty: Option<FuzzType>,
    count: FuzzCount,
}

#[derive(Arbitrary, Debug)]
enum Op {
    Bits(u8),
    Read(FuzzType),
    Array(FuzzType, u8),
    Vle8_16,
    Vle8_32,
    Vle16_32,
    Vle8_16_32,
    Vle4_4_8,
    String,
    DynamicCount,
    Skip(u16),
    Reset,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput<'a> {
    data: &'a [u8],
    fields: Vec<FuzzField>,
    ops: Vec<Op>,
    max_count: u16,
}

fn build_template(fields: &[FuzzField]) -> MessageTemplate {
    let mut template = MessageTemplate::new(0, "fuzz");
    for field in fields {
        let parent = field
            .parent
            .map(|index| FieldId::from(index as usize))
            .filter(|id| template.field(*id).is_some());
        let count = match field.count {
            FuzzCount::Fixed(n) => Count::Fixed(u32::from(n % 8)),
            FuzzCount::Dynamic(bits) => Count::Dynamic {
                bits: u32::from(bits % 34),
            },
        };
        // Invalid descriptions are rejected by the builder
        let _ = match field.ty {
            Some(ty) => template.add_field(parent, "f", ty.into(), count),
            None => template.add_struct(parent, "s", count),
        };
    }
    template
}

fn read_typed(deserializer: &mut Deserializer<'_>, ty: FuzzType) -> Result<(), Error> {
    match ty {
        FuzzType::Bit => deserializer.read::<bool>().map(drop),
        FuzzType::U8 => deserializer.read::<u8>().map(drop),
        FuzzType::S8 => deserializer.read::<i8>().map(drop),
        FuzzType::U16 => deserializer.read::<u16>().map(drop),
        FuzzType::S16 => deserializer.read::<i16>().map(drop),
        FuzzType::U32 => deserializer.read::<u32>().map(drop),
        FuzzType::S32 => deserializer.read::<i32>().map(drop),
        FuzzType::U64 => deserializer.read::<u64>().map(drop),
        FuzzType::S64 => deserializer.read::<i64>().map(drop),
        FuzzType::F32 => deserializer.read::<f32>().map(drop),
        FuzzType::F64 => deserializer.read::<f64>().map(drop),
    }
}

fn read_array(deserializer: &mut Deserializer<'_>, ty: FuzzType, count: usize) -> Result<(), Error> {
    match ty {
        FuzzType::Bit => deserializer.read_vec::<bool>(count).map(drop),
        FuzzType::U8 => deserializer.read_vec::<u8>(count).map(drop),
        FuzzType::S8 => deserializer.read_vec::<i8>(count).map(drop),
        FuzzType::U16 => deserializer.read_vec::<u16>(count).map(drop),
        FuzzType::S16 => deserializer.read_vec::<i16>(count).map(drop),
        FuzzType::U32 => deserializer.read_vec::<u32>(count).map(drop),
        FuzzType::S32 => deserializer.read_vec::<i32>(count).map(drop),
        FuzzType::U64 => deserializer.read_vec::<u64>(count).map(drop),
        FuzzType::S64 => deserializer.read_vec::<i64>(count).map(drop),
        FuzzType::F32 => deserializer.read_vec::<f32>(count).map(drop),
        FuzzType::F64 => deserializer.read_vec::<f64>(count).map(drop),
    }
}

fn run(deserializer: &mut Deserializer<'_>, ops: &[Op]) {
    let total = deserializer.bits_left();
    for op in ops {
        let before = deserializer.bits_left();
        let result = match op {
            Op::Bits(n) => deserializer.read_bits(u32::from(*n % 34)).map(drop),
            Op::Read(ty) => read_typed(deserializer, *ty),
            Op::Array(ty, n) => read_array(deserializer, *ty, usize::from(*n)),
            Op::Vle8_16 => deserializer.read_vle::<Vle8_16>().map(drop),
            Op::Vle8_32 => deserializer.read_vle::<Vle8_32>().map(drop),
            Op::Vle16_32 => deserializer.read_vle::<Vle16_32>().map(drop),
            Op::Vle8_16_32 => deserializer.read_vle::<Vle8_16_32>().map(drop),
            Op::Vle4_4_8 => deserializer.read_vle::<Vle<4, 4, 8>>().map(drop),
            Op::String => deserializer.read_string().map(drop),
            Op::DynamicCount => deserializer.dynamic_count().map(drop),
            Op::Skip(n) => deserializer.skip_bits(usize::from(*n)),
            Op::Reset => {
                deserializer.reset_traversal();
                assert_eq!(deserializer.bits_left(), total);
                continue;
            }
        };

        // Exhaustion never consumes bits
        if result == Err(Error::EndOfBuffer) {
            assert_eq!(deserializer.bits_left(), before);
        }
        assert!(deserializer.bits_left() <= before);
        assert!(deserializer.bit_pos() < 8);
        assert_eq!(
            deserializer.byte_pos() * 8 + deserializer.bit_pos() + deserializer.bits_left(),
            total
        );
    }
}

fn fuzz(input: FuzzInput) {
    // Free-form
    let mut deserializer = Deserializer::new(input.data);
    run(&mut deserializer, &input.ops);

    // Template-driven
    let template = build_template(&input.fields);
    let cfg = Config {
        dynamic_count: RangeCfg::new(..=u32::from(input.max_count)),
        ..Default::default()
    };
    let mut deserializer = Deserializer::with_config(input.data, Some(&template), cfg);
    run(&mut deserializer, &input.ops);
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
