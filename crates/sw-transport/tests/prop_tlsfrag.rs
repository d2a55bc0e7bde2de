use proptest::prelude::*;
use std::io::Write;
use sw_transport::tlsfrag::{FragWriter, HEADER_SIZE};

fn record(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![kind, 3, 1];
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn expected_split(payload: &[u8], offset: usize, trailing: &[u8]) -> Vec<u8> {
    let (a, b) = payload.split_at(offset);
    [record(22, a), record(22, b), trailing.to_vec()].concat()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // 推模式：首个握手记录被拆为两段，后续字节原样透传
    #[test]
    fn push_splits_first_record_once(
        payload in prop::collection::vec(any::<u8>(), 2..2000),
        offset_seed in any::<usize>(),
        trailing in prop::collection::vec(any::<u8>(), 0..64),
        second in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let offset = 1 + offset_seed % (payload.len() - 1);
        let mut input = record(22, &payload);
        input.extend_from_slice(&trailing);

        let mut w = FragWriter::new(Vec::new(), offset);
        prop_assert_eq!(w.write(&input).unwrap(), input.len());
        prop_assert!(!w.is_armed());
        w.write_all(&input).unwrap();
        w.write_all(&second).unwrap();

        let out = w.into_inner();
        let expected = [expected_split(&payload, offset, &trailing), input.clone(), second].concat();
        prop_assert_eq!(out, expected);
    }

    // 拉模式与推模式输出一致
    #[test]
    fn pull_matches_push(
        payload in prop::collection::vec(any::<u8>(), 2..2000),
        offset_seed in any::<usize>(),
        trailing in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let offset = 1 + offset_seed % (payload.len() - 1);
        let mut input = record(22, &payload);
        input.extend_from_slice(&trailing);

        let mut push = FragWriter::new(Vec::new(), offset);
        push.write_all(&input).unwrap();

        let mut pull = FragWriter::new(Vec::new(), offset);
        let moved = pull.read_from(&mut input.as_slice()).unwrap();
        prop_assert_eq!(moved, input.len() as u64);
        prop_assert_eq!(pull.into_inner(), push.into_inner());
    }

    // 偏移不小于记录长度或非握手记录时，输出与输入完全相同
    #[test]
    fn ineligible_records_pass_through(
        kind in prop_oneof![Just(20u8), Just(21u8), Just(22u8), Just(23u8)],
        payload in prop::collection::vec(any::<u8>(), 0..512),
        extra in 0usize..64,
    ) {
        let offset = if kind == 22 { payload.len() + extra.max(1) } else { 1 + extra };
        let input = record(kind, &payload);

        let mut push = FragWriter::new(Vec::new(), offset);
        push.write_all(&input).unwrap();
        prop_assert_eq!(push.into_inner(), input.clone());

        let mut pull = FragWriter::new(Vec::new(), offset);
        pull.read_from(&mut input.as_slice()).unwrap();
        prop_assert_eq!(pull.into_inner(), input);
    }

    // 输出长度恰好多出一个记录头
    #[test]
    fn split_adds_exactly_one_header(
        len in 2usize..5000,
        offset_seed in any::<usize>(),
    ) {
        let offset = 1 + offset_seed % (len - 1);
        let input = record(22, &vec![0xAA; len]);
        let mut w = FragWriter::new(Vec::new(), offset);
        w.write_all(&input).unwrap();
        prop_assert_eq!(w.into_inner().len(), input.len() + HEADER_SIZE);
    }
}
