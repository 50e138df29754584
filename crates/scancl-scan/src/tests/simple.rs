use core::mem::size_of;

use scancl_runtime::client::ComputeClient;
use scancl_runtime::memory_management::{DeviceSlice, DeviceSliceMut};

use super::{TestElement, sample};
use crate::{DeviceScan, ScanConfig, ScanInstruction};

#[macro_export]
macro_rules! testgen_scan_simple {
    () => {
        mod scan_simple {
            use super::*;
            use $crate::instructions::*;
            use $crate::tests::{Runtime, bf16, f16};

            $crate::testgen_scan_simple!(@group: [ty=[i8, u8, i16, u16, i32, u32, u64], sizes=[0, 1, 11, 12, 13, 100, 1_000, 4097, 100_000]]: {
                Add: ZERO;
                Max: MIN;
                BitXor: ZERO;
            });
            $crate::testgen_scan_simple!(@group: [ty=[f32, f64], sizes=[1, 12, 13, 1_000, 4097]]: {
                Add: ZERO;
                Min: MAX;
            });
            $crate::testgen_scan_simple!(@group: [ty=[f16, bf16], sizes=[1, 13, 1_000]]: {
                Max: MIN;
            });
        }
    };
    (@group: [ty=[$($ty:ident),*], sizes=$sizes:expr]: $rest:tt) => {
        $(
            $crate::testgen_scan_simple!(@group: [ty=$ty, sizes=$sizes, exclusive]: $rest);
            $crate::testgen_scan_simple!(@group: [ty=$ty, sizes=$sizes, inclusive]: $rest);
        )*
    };
    (@group: [ty=$ty:ident, sizes=$sizes:expr, $mode:ident]: {
        $( $instr:ident : $identity:ident ; )*
    }) => {
        $(
            paste::paste! {
                #[test]
                fn [<test_ $ty _ $mode _ $instr:lower>]() {
                    let client = TestRuntime::client(&Default::default());
                    for num_items in $sizes {
                        for small_tiles in [true, false] {
                            let test = $crate::tests::simple::TestCase {
                                num_items,
                                inclusive: stringify!($mode) == "inclusive",
                                small_tiles,
                            };
                            test.test_scan::<$ty, $instr>(
                                &client,
                                $instr,
                                <$ty as ScanNumeric>::$identity,
                            );
                        }
                    }
                }
            }
        )*
    };
}

#[derive(Debug)]
pub struct TestCase {
    pub num_items: usize,
    pub inclusive: bool,
    /// Tiles of 4 units by 3 items, so that short inputs still span many tiles.
    pub small_tiles: bool,
}

impl TestCase {
    pub fn config<N>(&self) -> ScanConfig {
        let config = ScanConfig::new::<N>();
        match self.small_tiles {
            true => config.with_units_per_tile(4).with_items_per_unit(3),
            false => config,
        }
    }

    pub fn test_scan<N: TestElement, I: ScanInstruction<N> + Clone>(
        &self,
        client: &ComputeClient,
        op: I,
        identity: N,
    ) {
        let len = self.num_items;
        let data = sample::<N>(len);
        let expected = self.reference_scan(&data, identity, &op);

        let input = client.create_from_slice(&data).unwrap();
        let output = client.empty(len * size_of::<N>()).unwrap();
        let config = self.config::<N>();
        let identity = (!self.inclusive).then_some(identity);

        let mut scratch_bytes = 0;
        let bind = || {
            (
                DeviceSlice::<N>::new(input.clone(), len).unwrap(),
                DeviceSliceMut::<N>::new(output.clone(), len).unwrap(),
            )
        };

        let (source, destination) = bind();
        DeviceScan::scan(
            client,
            None,
            &mut scratch_bytes,
            source,
            destination,
            op.clone(),
            identity,
            len,
            &config,
        )
        .unwrap();

        let scratch = client.empty(scratch_bytes).unwrap();
        let (source, destination) = bind();
        DeviceScan::scan(
            client,
            Some(&scratch),
            &mut scratch_bytes,
            source,
            destination,
            op,
            identity,
            len,
            &config,
        )
        .unwrap();

        let actual = client.read_as::<N>(&output).unwrap();
        assert_eq!(&actual[..len], &expected[..], "{self:?}");
    }

    fn reference_scan<N: TestElement, I: ScanInstruction<N>>(
        &self,
        data: &[N],
        identity: N,
        op: &I,
    ) -> Vec<N> {
        data.iter()
            .scan(identity, |acc, value| {
                let before = *acc;
                *acc = op.combine(*acc, *value);
                Some(if self.inclusive { *acc } else { before })
            })
            .collect()
    }
}
