mod dummy;

use std::sync::Arc;
use std::time::Duration;

use dummy::*;
use scancl_runtime::memory_management::{DeviceSlice, DeviceSliceMut, MemoryDeviceProperties};
use scancl_runtime::server::{CubeCount, LaunchError, ResourceLimitError, ServerError};
use scancl_runtime::{DeviceProperties, Feature, HardwareProperties, StreamId};

#[test_log::test]
fn created_resource_is_the_same_when_read() {
    let client = test_client();
    let resource = Vec::from([0u32, 1, 2]);
    let handle = client.create_from_slice(&resource).unwrap();

    let obtained_resource = client.read_as::<u32>(&handle).unwrap();

    assert_eq!(resource, obtained_resource)
}

#[test_log::test]
fn empty_allocates_zeroed_memory() {
    let client = test_client();
    let handle = client.empty(4).unwrap();

    let empty_resource = client.read(&handle).unwrap();

    assert_eq!(empty_resource, vec![0; 4]);
}

#[test_log::test]
fn writes_are_ordered_with_reads() {
    let client = test_client();
    let handle = client.empty(8).unwrap();

    client.write(&handle, &[1, 2, 3]).unwrap();

    assert_eq!(client.read(&handle).unwrap(), vec![1, 2, 3, 0, 0, 0, 0, 0]);
}

#[test_log::test]
fn execute_elementwise_addition() {
    let client = test_client();
    let len = 100;
    let lhs: Vec<u32> = (0..len).collect();
    let rhs = vec![4u32; len as usize];
    let out = client.empty(len as usize * 4).unwrap();

    let kernel = ElementwiseAddition {
        lhs: DeviceSlice::new(client.create_from_slice(&lhs).unwrap(), len as usize).unwrap(),
        rhs: DeviceSlice::new(client.create_from_slice(&rhs).unwrap(), len as usize).unwrap(),
        out: DeviceSliceMut::new(out.clone(), len as usize).unwrap(),
    };
    let count = CubeCount::new_1d((len as usize).div_ceil(ELEMS_PER_CUBE) as u32);
    client.launch(Arc::new(kernel), count).unwrap();

    let obtained_resource = client.read_as::<u32>(&out).unwrap();
    let expected: Vec<u32> = (0..len).map(|i| i + 4).collect();

    assert_eq!(obtained_resource, expected)
}

#[test_log::test]
fn memory_is_released_after_the_kernel() {
    let client = client_with(DeviceProperties::default());
    let out = client.empty(64).unwrap();
    let kernel = FillKernel {
        out: DeviceSliceMut::new(out, 16).unwrap(),
    };

    client.launch(Arc::new(kernel), CubeCount::new_1d(16)).unwrap();
    client.sync().unwrap();
    assert_eq!(client.memory_usage().number_allocs, 0);
}

#[test_log::test]
fn fault_surfaces_at_sync() {
    let client = client_with(DeviceProperties::default());

    client
        .launch(Arc::new(TrapKernel { cube: 5 }), CubeCount::new_1d(32))
        .unwrap();
    let result = client.sync();

    assert!(matches!(
        result,
        Err(ServerError::Execution { cube_pos: 5, .. })
    ));
    // The fault is reported once.
    client.sync().unwrap();
}

#[test_log::test]
fn fault_surfaces_at_read() {
    let client = client_with(DeviceProperties::default());
    let handle = client.empty(4).unwrap();

    client
        .launch(Arc::new(TrapKernel { cube: 0 }), CubeCount::new_1d(1))
        .unwrap();

    assert!(matches!(
        client.read(&handle),
        Err(ServerError::Execution { .. })
    ));
}

#[test_log::test]
fn timeout_keeps_the_fault_for_the_next_sync() {
    let client = client_with(DeviceProperties::default());

    client
        .launch(
            Arc::new(SleepKernel {
                duration: Duration::from_millis(300),
            }),
            CubeCount::new_1d(1),
        )
        .unwrap();
    client
        .launch(Arc::new(TrapKernel { cube: 0 }), CubeCount::new_1d(1))
        .unwrap();

    assert!(matches!(
        client.sync_timeout(Duration::from_millis(10)),
        Err(ServerError::Timeout { .. })
    ));
    assert!(matches!(
        client.sync(),
        Err(ServerError::Execution { .. })
    ));
}

#[test_log::test]
fn streams_are_independent() {
    let client = client_with(DeviceProperties::default());
    let slow = client.with_stream(StreamId::explicit(0));
    let fast = client.with_stream(StreamId::explicit(1));

    slow.launch(
        Arc::new(SleepKernel {
            duration: Duration::from_millis(500),
        }),
        CubeCount::new_1d(1),
    )
    .unwrap();
    let handle = fast.create_from_slice(&[7u32]).unwrap();

    assert_eq!(fast.read_as::<u32>(&handle).unwrap(), vec![7]);
    fast.sync_timeout(Duration::from_millis(250)).unwrap();
    slow.sync().unwrap();
}

#[test_log::test]
fn launch_is_validated_before_submission() {
    let client = client_with(DeviceProperties::new(
        &[],
        MemoryDeviceProperties::default(),
        HardwareProperties {
            max_cube_count: (8, 1, 1),
            ..Default::default()
        },
    ));

    let result = client.launch(Arc::new(TrapKernel { cube: 0 }), CubeCount::new_1d(9));

    assert!(matches!(
        result,
        Err(LaunchError::TooManyResources(
            ResourceLimitError::CubeCount { .. }
        ))
    ));
    client.sync().unwrap();
}

#[test_log::test]
fn device_launch_runs_child_grid() {
    let client = client_with(DeviceProperties::default());
    let out = client.empty(16).unwrap();
    let kernel = ParentKernel {
        out: DeviceSliceMut::new(out.clone(), 4).unwrap(),
        child_trap: false,
    };

    client.launch(Arc::new(kernel), CubeCount::new_1d(1)).unwrap();

    assert_eq!(client.read_as::<u32>(&out).unwrap(), vec![1, 2, 3, 4]);
}

#[test_log::test]
fn device_launch_fault_traps_the_parent() {
    let client = client_with(DeviceProperties::default());
    let kernel = ParentKernel {
        out: DeviceSliceMut::new(client.empty(16).unwrap(), 4).unwrap(),
        child_trap: true,
    };

    client.launch(Arc::new(kernel), CubeCount::new_1d(1)).unwrap();

    match client.sync() {
        Err(ServerError::Execution { reason, .. }) => assert!(reason.contains("Illegal address")),
        other => panic!("Expected an execution error, got {other:?}"),
    }
}

#[test_log::test]
fn device_launch_needs_the_feature() {
    let client = client_with(DeviceProperties::new(
        &[],
        MemoryDeviceProperties::default(),
        HardwareProperties::default(),
    ));
    let kernel = ParentKernel {
        out: DeviceSliceMut::new(client.empty(16).unwrap(), 4).unwrap(),
        child_trap: false,
    };

    client.launch(Arc::new(kernel), CubeCount::new_1d(1)).unwrap();

    assert!(!client.properties().feature_enabled(Feature::DeviceLaunch));
    match client.sync() {
        Err(ServerError::Execution { reason, .. }) => assert!(reason.contains("Unsupported")),
        other => panic!("Expected an execution error, got {other:?}"),
    }
}
