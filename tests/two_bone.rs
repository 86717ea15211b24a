use glam::{DMat4, DVec3};
use rig_solvers::batch::evaluate_batch;
use rig_solvers::{IkFk2Bone, Plug, Pose, RigError, RigNode, TwoBoneSocket};

const EPS: f64 = 1e-9;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 3-4-5 手臂，FK 关节伸直沿 +X
fn arm() -> IkFk2Bone {
    IkFk2Bone {
        length_a: 3.0,
        length_b: 4.0,
        max_stretch: 1.0,
        ik_ref: DMat4::from_translation(DVec3::new(5.0, 0.0, 0.0)),
        upv: DMat4::from_translation(DVec3::new(2.5, 10.0, 0.0)),
        fk0: DMat4::IDENTITY,
        fk1: DMat4::from_translation(DVec3::new(3.0, 0.0, 0.0)),
        fk2: DMat4::from_translation(DVec3::new(7.0, 0.0, 0.0)),
        ..IkFk2Bone::default()
    }
}

fn translation(m: DMat4) -> DVec3 {
    m.w_axis.truncate()
}

#[test]
fn ik_outputs_through_node() {
    init_logger();
    let mut node = IkFk2Bone { blend: 1.0, ..arm() };

    let a = node.compute(Plug::OutA).unwrap().as_matrix().unwrap();
    let b = node.compute(Plug::OutB).unwrap().as_matrix().unwrap();
    let eff = node.compute(Plug::OutEff).unwrap().as_matrix().unwrap();

    assert!(translation(a).length() < EPS);
    assert!((translation(b) - DVec3::new(1.8, 2.4, 0.0)).length() < EPS);
    assert!((translation(eff) - DVec3::new(5.0, 0.0, 0.0)).length() < EPS);

    // 第一骨 x 轴指向肘部
    let x = a.transform_vector3(DVec3::X).normalize();
    assert!((x - DVec3::new(0.6, 0.8, 0.0)).length() < EPS);
}

#[test]
fn fk_outputs_follow_fk_joints() {
    init_logger();
    let mut node = arm();

    let b = node.compute(Plug::OutB).unwrap().as_matrix().unwrap();
    assert!((translation(b) - DVec3::new(3.0, 0.0, 0.0)).length() < EPS);

    // 第一骨沿 x 轴缩放到骨长
    let a = Pose::from_matrix(node.compute(Plug::OutA).unwrap().as_matrix().unwrap());
    assert!((a.scale - DVec3::new(3.0, 1.0, 1.0)).length() < EPS);

    let eff = node.compute(Plug::OutEff).unwrap().as_matrix().unwrap();
    assert!((translation(eff) - DVec3::new(7.0, 0.0, 0.0)).length() < EPS);
}

#[test]
fn half_blend_lies_between_fk_and_ik() {
    init_logger();
    let node = IkFk2Bone { blend: 0.5, ..arm() };
    let elbow = translation(node.evaluate(TwoBoneSocket::B));

    // 肘部在两种解之间，且骨长不变
    assert!(elbow.y > 0.0 && elbow.y < 2.4);
    assert!((elbow.length() - 3.0).abs() < 1e-6);

    let center = Pose::from_matrix(node.evaluate(TwoBoneSocket::Center));
    assert!((center.translation - elbow).length() < 1e-9);
    assert!(!center.to_matrix().is_nan());
}

#[test]
fn output_parents_apply_per_socket() {
    let parent = DMat4::from_translation(DVec3::new(0.0, 0.0, -2.0));
    let mut node = IkFk2Bone {
        blend: 1.0,
        eff_parent: parent,
        ..arm()
    };
    let eff = node.compute(Plug::OutEff).unwrap().as_matrix().unwrap();
    assert!((translation(eff) - DVec3::new(5.0, 0.0, 2.0)).length() < EPS);

    let a = node.compute(Plug::OutA).unwrap().as_matrix().unwrap();
    assert!(translation(a).length() < EPS);
}

#[test]
fn unknown_plug_is_reported() {
    let mut node = arm();
    assert_eq!(
        node.compute(Plug::Output),
        Err(RigError::UnknownPlug {
            node: IkFk2Bone::NODE_TYPE,
            plug: Plug::Output,
        })
    );
    assert!(!node.owns(Plug::Translate));
    assert!(node.owns(Plug::OutCenter));
}

#[test]
fn batch_matches_single_evaluation() {
    init_logger();
    let mut nodes: Vec<IkFk2Bone> = (0..100)
        .map(|i| IkFk2Bone {
            blend: i as f64 / 99.0,
            ..arm()
        })
        .collect();

    let results = evaluate_batch(&mut nodes, Plug::OutB);
    for (node, result) in nodes.iter().zip(results) {
        let m = result.unwrap().as_matrix().unwrap();
        assert!(m.abs_diff_eq(node.evaluate(TwoBoneSocket::B), 1e-12));
    }
}
