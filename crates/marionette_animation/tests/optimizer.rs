//! Integration tests for the optimizer passes
//!
//! These tests verify that:
//! - Curve elevation hoists a shared curve only when every condition holds
//! - Obsolete keyframe removal keeps the parent's series and drops emptied children
//! - Absent color endpoints fade from or to the opposite endpoint
//! - Optimizing twice changes nothing, even when removal exposes a shared curve

use marionette_animation::{Animation, CubicBezier, Curve};
use marionette_core::{Color, Lens};

#[derive(Default)]
struct Sprite {
    x: f64,
    tint: Option<Color>,
}

#[derive(Default)]
struct Scene {
    left: Sprite,
    right: Sprite,
    opacity: f64,
}

fn x() -> Lens<Sprite, f64> {
    Lens::new("x", |s: &Sprite| &s.x, |s: &mut Sprite| &mut s.x)
}

fn tint() -> Lens<Sprite, Option<Color>> {
    Lens::new("tint", |s: &Sprite| &s.tint, |s: &mut Sprite| &mut s.tint)
}

fn left() -> Lens<Scene, Sprite> {
    Lens::new("left", |s: &Scene| &s.left, |s: &mut Scene| &mut s.left)
}

fn right() -> Lens<Scene, Sprite> {
    Lens::new("right", |s: &Scene| &s.right, |s: &mut Scene| &mut s.right)
}

fn opacity() -> Lens<Scene, f64> {
    Lens::new("opacity", |s: &Scene| &s.opacity, |s: &mut Scene| &mut s.opacity)
}

fn ease_in_ease_out() -> Curve {
    Curve::CubicBezier(CubicBezier::EASE_IN_EASE_OUT)
}

fn slide(curve: Curve) -> Animation<Sprite> {
    let mut animation = Animation::new();
    animation.add_keyframe(&x(), 0.0, 0.0);
    animation.add_keyframe(&x(), 1.0, 100.0);
    animation.curve = curve;
    animation
}

fn two_children(first: (Curve, f64, f64), second: (Curve, f64, f64)) -> Animation<Scene> {
    let mut scene = Animation::new();
    scene.add_child(slide(first.0), &left(), first.1, first.2);
    scene.add_child(slide(second.0), &right(), second.1, second.2);
    scene
}

fn child_curves(animation: &Animation<Scene>) -> Vec<Curve> {
    animation
        .children()
        .iter()
        .map(|child| child.animation().curve.clone())
        .collect()
}

/// Test that a shared curve moves onto a parent whose children span its whole timeline
#[test]
fn test_curve_elevation() {
    let scene = two_children(
        (ease_in_ease_out(), 0.0, 1.0),
        (ease_in_ease_out(), 0.0, 1.0),
    );

    let optimized = scene.optimized();
    assert_eq!(optimized.curve, ease_in_ease_out());
    assert_eq!(child_curves(&optimized), vec![Curve::Linear, Curve::Linear]);

    // The curve is applied once, at the parent.
    let mut rendered = Scene::default();
    scene.apply(&mut rendered, 0.3);
    let expected = 100.0 * CubicBezier::EASE_IN_EASE_OUT.adjusted_progress(0.3);
    assert!((rendered.left.x - expected).abs() < 1e-9);
    assert!((rendered.right.x - expected).abs() < 1e-9);
}

/// Test that elevation recurses through grandchildren
#[test]
fn test_curve_elevation_through_grandchildren() {
    let mut wrapper = Animation::<Sprite>::new();
    wrapper.add_child(slide(ease_in_ease_out()), &Lens::identity(), 0.0, 1.0);

    let mut scene = Animation::<Scene>::new();
    scene.add_child(wrapper, &left(), 0.0, 1.0);
    scene.add_child(slide(ease_in_ease_out()), &right(), 0.0, 1.0);

    let optimized = scene.optimized();
    assert_eq!(optimized.curve, ease_in_ease_out());
    let wrapper = optimized.children()[0].animation();
    assert_eq!(wrapper.curve, Curve::Linear);
    assert_eq!(wrapper.children()[0].animation().curve, Curve::Linear);
}

/// Test every condition that blocks elevation
#[test]
fn test_curve_elevation_negative_cases() {
    let split = two_children(
        (ease_in_ease_out(), 0.0, 0.5),
        (ease_in_ease_out(), 0.5, 0.5),
    );
    let differing = two_children(
        (ease_in_ease_out(), 0.0, 1.0),
        (Curve::ParabolicEaseIn, 0.0, 1.0),
    );
    let mut own_keyframes = two_children(
        (ease_in_ease_out(), 0.0, 1.0),
        (ease_in_ease_out(), 0.0, 1.0),
    );
    own_keyframes.add_keyframe(&opacity(), 1.0, 1.0);
    let mut curved_parent = two_children(
        (ease_in_ease_out(), 0.0, 1.0),
        (ease_in_ease_out(), 0.0, 1.0),
    );
    curved_parent.curve = Curve::SinusoidalEaseInEaseOut;

    for scene in [split, differing, own_keyframes, curved_parent] {
        let optimized = scene.optimized();
        assert_eq!(optimized.curve, scene.curve);
        assert_eq!(child_curves(&optimized), child_curves(&scene));
    }
}

/// Test that a parent's series replaces the same path on a descendant
#[test]
fn test_obsolete_keyframe_removal() {
    let left_x = left().then(&x());
    let left_tint = left().then(&tint());

    let mut tinted = slide(Curve::Linear);
    tinted.add_keyframe(&tint(), 1.0, Some(Color::RED));

    let mut scene = Animation::<Scene>::new();
    scene.add_keyframe(&left_x, 0.0, 50.0);
    scene.add_child(tinted, &left(), 0.0, 1.0);

    let optimized = scene.optimized();
    assert!(optimized.has_keyframes(left_x.path()));
    let child = optimized.children()[0].animation();
    assert!(!child.has_keyframes(left_x.path()));
    assert!(child.has_keyframes(left_tint.path()));

    let mut rendered = Scene::default();
    scene.apply(&mut rendered, 1.0);
    assert_eq!(rendered.left.x, 50.0);
}

/// Test that a child left empty by removal disappears
#[test]
fn test_emptied_child_is_dropped() {
    let mut scene = Animation::<Scene>::new();
    scene.add_keyframe(&left().then(&x()), 0.0, 50.0);
    scene.add_child(slide(Curve::Linear), &left(), 0.0, 1.0);
    scene.add_child(slide(Curve::Linear), &right(), 0.0, 1.0);

    let optimized = scene.optimized();
    assert_eq!(optimized.children().len(), 1);
    assert_eq!(optimized.children()[0].subelement().to_string(), "right");
}

fn fade(first: Option<Color>, last: Option<Color>) -> Animation<Sprite> {
    let mut animation = Animation::new();
    animation.add_keyframe(&tint(), 0.0, first);
    animation.add_keyframe(&tint(), 1.0, last);
    animation
}

/// Test fading in from no color
#[test]
fn test_absent_first_color_fades_in() {
    let animation = fade(None, Some(Color::RED));
    let mut sprite = Sprite {
        tint: Some(Color::BLUE),
        ..Default::default()
    };

    animation.apply(&mut sprite, 0.0);
    assert_eq!(sprite.tint, Some(Color::RED.with_alpha(0.0)));
    animation.apply(&mut sprite, 0.5);
    assert_eq!(sprite.tint, Some(Color::RED.with_alpha(0.5)));
}

/// Test fading out to no color
#[test]
fn test_absent_last_color_fades_out() {
    let animation = fade(Some(Color::GREEN), None);
    let mut sprite = Sprite::default();

    animation.apply(&mut sprite, 1.0);
    assert_eq!(sprite.tint, Some(Color::GREEN.with_alpha(0.0)));
}

/// Test that two absent endpoints stay absent
#[test]
fn test_both_colors_absent_is_unchanged() {
    let animation = fade(None, None);
    assert_eq!(animation.optimized().blueprint(), animation.blueprint());

    let mut sprite = Sprite {
        tint: Some(Color::BLUE),
        ..Default::default()
    };
    animation.apply(&mut sprite, 0.3);
    assert_eq!(sprite.tint, None);
}

/// Test that optimizing an optimized tree changes nothing
#[test]
fn test_optimization_is_idempotent() {
    let mut wrapper = Animation::<Sprite>::new();
    wrapper.add_child(slide(ease_in_ease_out()), &Lens::identity(), 0.0, 1.0);
    wrapper.add_child(fade(None, Some(Color::WHITE)), &Lens::identity(), 0.0, 1.0);

    let mut scene = Animation::<Scene>::new();
    scene.add_keyframe(&right().then(&x()), 1.0, 20.0);
    scene.add_child(wrapper, &left(), 0.0, 1.0);
    scene.add_child(slide(Curve::ParabolicEaseOut), &right(), 0.25, 0.5);
    scene.add_execution(0.5, |_| {}, |_| {});

    let once = scene.optimized();
    let twice = once.optimized();
    assert_eq!(twice.blueprint(), once.blueprint());
}

/// Test that removal runs before elevation so a second pass has nothing left to hoist
#[test]
fn test_removal_exposes_a_shared_curve() {
    let mut middle = Animation::<Scene>::new();
    middle.add_child(slide(Curve::ParabolicEaseIn), &left(), 0.0, 1.0);
    middle.add_child(slide(Curve::ParabolicEaseOut), &right(), 0.0, 1.0);

    let mut scene = Animation::<Scene>::new();
    scene.add_keyframe(&right().then(&x()), 1.0, 20.0);
    scene.add_child(middle, &Lens::identity(), 0.0, 1.0);

    let once = scene.optimized();
    let middle = once.children()[0].animation();
    assert_eq!(middle.curve, Curve::ParabolicEaseIn);
    assert_eq!(child_curves(middle), vec![Curve::Linear]);
    assert_eq!(once.optimized().blueprint(), once.blueprint());
}

/// Test that elevation repeats until a hoist no longer exposes another
#[test]
fn test_elevation_reaches_a_fixpoint() {
    let wrapped = || {
        let mut wrapper = Animation::<Sprite>::new();
        wrapper.curve = Curve::ParabolicEaseOut;
        wrapper.add_child(slide(Curve::ParabolicEaseIn), &Lens::identity(), 0.0, 1.0);
        wrapper
    };
    let mut scene = Animation::<Scene>::new();
    scene.add_child(wrapped(), &left(), 0.0, 1.0);
    scene.add_child(wrapped(), &right(), 0.0, 1.0);

    let once = scene.optimized();
    assert_eq!(once.curve, Curve::ParabolicEaseOut);
    assert_eq!(
        child_curves(&once),
        vec![Curve::ParabolicEaseIn, Curve::ParabolicEaseIn]
    );
    for wrapper in once.children() {
        assert_eq!(wrapper.animation().children()[0].animation().curve, Curve::Linear);
    }
    assert_eq!(once.optimized().blueprint(), once.blueprint());

    let mut rendered = Scene::default();
    scene.apply(&mut rendered, 0.3);
    let eased = Curve::ParabolicEaseOut.adjusted_progress(0.3);
    let expected = 100.0 * Curve::ParabolicEaseIn.adjusted_progress(eased);
    assert!((rendered.left.x - expected).abs() < 1e-9);
    assert!((rendered.right.x - expected).abs() < 1e-9);
}

