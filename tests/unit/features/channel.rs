use super::*;
use crate::features::context::resolve_feature_context;
use crate::fixtures::{float_track, state_with};
use crate::timeline::model::Track;

fn ctx(channels: usize, layout: Option<ChannelLayout>, aliases: Option<&[&str]>) -> AudioFeatureTrack {
    let mut t = float_track("rms", 1, channels, 1, 60.0, |_, _, _| 0.0);
    t.channel_layout = layout;
    t.channel_aliases = aliases.map(|a| a.iter().map(|s| (*s).to_owned()).collect());
    t
}

fn resolve(track: &AudioFeatureTrack, selector: ChannelSelector) -> Result<usize, ChannelResolutionError> {
    resolve_channel(&selector, &ChannelContext::new(track, None))
}

#[test]
fn precedence_with_stereo_aliases() {
    let t = ctx(2, None, Some(&["L", "R"]));
    assert_eq!(resolve(&t, ChannelSelector::alias("r")), Ok(1));
    assert_eq!(resolve(&t, ChannelSelector::Index(1.0)), Ok(1));
    assert_eq!(resolve(&t, ChannelSelector::alias("1")), Ok(1));
    let err = resolve(&t, ChannelSelector::alias("unknown")).unwrap_err();
    assert_eq!(
        err,
        ChannelResolutionError::Unmatched {
            selector: "unknown".to_owned(),
            channel_count: 2
        }
    );
}

#[test]
fn indices_floor_and_clamp() {
    let t = ctx(4, None, None);
    assert_eq!(resolve(&t, ChannelSelector::Index(2.9)), Ok(2));
    assert_eq!(resolve(&t, ChannelSelector::Index(40.0)), Ok(3));
    assert_eq!(resolve(&t, ChannelSelector::Index(-3.0)), Ok(0));
    assert_eq!(resolve(&t, ChannelSelector::alias("-1")), Ok(0));
    assert!(resolve(&t, ChannelSelector::Index(f64::NAN)).is_err());

    let empty = ctx(0, None, None);
    assert_eq!(resolve(&empty, ChannelSelector::alias("whatever")), Ok(0));
}

#[test]
fn aliases_beat_semantic_tokens() {
    // Alias "l" deliberately points at channel 1.
    let t = ctx(2, None, Some(&["x", "l"]));
    assert_eq!(resolve(&t, ChannelSelector::alias("L")), Ok(1));
    assert_eq!(resolve(&t, ChannelSelector::alias("right")), Ok(1));
    assert_eq!(resolve(&t, ChannelSelector::alias("left")), Ok(0));
}

#[test]
fn cache_aliases_are_a_fallback() {
    let t = ctx(2, None, None);
    let cache = AudioFeatureCache {
        channel_aliases: Some(vec!["front".to_owned(), "rear".to_owned()]),
        ..AudioFeatureCache::default()
    };
    let c = ChannelContext::new(&t, Some(&cache));
    assert_eq!(resolve_channel(&ChannelSelector::alias("REAR"), &c), Ok(1));
}

#[test]
fn semantic_tokens_follow_layout() {
    let mono = ctx(1, None, None);
    assert_eq!(resolve(&mono, ChannelSelector::alias("right")), Ok(0));

    let ms = ctx(2, Some(ChannelLayout::MidSide), None);
    assert_eq!(resolve(&ms, ChannelSelector::alias("side")), Ok(1));
    assert_eq!(
        resolve(&ms, ChannelSelector::Semantic(SemanticChannel::Left)),
        Err(ChannelResolutionError::LayoutMismatch {
            token: SemanticChannel::Left,
            layout: ChannelLayout::MidSide
        })
    );

    let multi = ctx(6, None, None);
    assert!(resolve(&multi, ChannelSelector::alias("left")).is_err());
}

#[test]
fn descriptor_wrappers_are_lenient() {
    let mut t = ctx(2, None, Some(&["L", "R"]));
    t.frame_count = 1;
    let state = state_with(Track::audio("a1"), vec![t]);
    let fc = resolve_feature_context(&state, "a1", "rms").unwrap();

    let d = AudioFeatureDescriptor::new("rms");
    assert_eq!(resolve_descriptor_channel(&d, &fc), None);
    assert_eq!(resolve_descriptor_channel_index(&d, &fc), 0);

    let d = d.with_channel(ChannelSelector::alias("unknown"));
    assert_eq!(resolve_descriptor_channel(&d, &fc), Some(0));

    let d = AudioFeatureDescriptor::new("rms").with_channel(ChannelSelector::alias("R"));
    assert_eq!(resolve_descriptor_channel_index(&d, &fc), 1);
}

#[test]
fn layout_mismatch_message_names_the_token() {
    let err = ChannelResolutionError::LayoutMismatch {
        token: SemanticChannel::Left,
        layout: ChannelLayout::MidSide,
    };
    assert_eq!(
        err.to_string(),
        "semantic channel 'left' is not defined for a MidSide layout"
    );
    assert_eq!(SemanticChannel::Side.to_string(), "side");
}
