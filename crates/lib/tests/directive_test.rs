//! # Directive Decoder Tests
//!
//! Checks the public decoding contract on replies shaped like real model output.

use admitrag::{DirectiveDecoder, Trigger};

#[test]
fn test_multiline_reply_with_trailing_marker() {
    let decoder = DirectiveDecoder::new().unwrap();
    let raw = "The WFA course covers:\n- Patient assessment\n- Splinting\n\n[SHOW_SYLLABUS]\n";

    let decoded = decoder.decode(raw);

    assert_eq!(
        decoded.cleaned,
        "The WFA course covers:\n- Patient assessment\n- Splinting"
    );
    assert_eq!(decoded.trigger, Some(Trigger::Syllabus));
}

#[test]
fn test_every_marker_maps_to_its_trigger() {
    let decoder = DirectiveDecoder::new().unwrap();
    let cases = [
        ("[SHOW_SLIDESHOW]", Trigger::Slideshow),
        ("[SHOW_SYLLABUS]", Trigger::Syllabus),
        ("[SHOW_VIDEO]", Trigger::Video),
        ("[SHOW_OFFER:spring]", Trigger::Offer),
    ];
    for (marker, expected) in cases {
        let decoded = decoder.decode(&format!("Answer. {marker}"));
        assert_eq!(decoded.trigger, Some(expected), "marker: {marker}");
        assert_eq!(decoded.cleaned, "Answer.", "marker: {marker}");
    }
}

#[test]
fn test_offer_loses_to_higher_priority_marker() {
    let decoder = DirectiveDecoder::new().unwrap();

    let decoded = decoder.decode("[SHOW_OFFER:a,b] Pricing and a tour. [SHOW_SLIDESHOW]");

    assert_eq!(decoded.trigger, Some(Trigger::Slideshow));
    assert!(decoded.trigger_args.is_empty());
    assert_eq!(decoded.cleaned, "Pricing and a tour.");
}

#[test]
fn test_lowercase_marker_is_not_recognized() {
    let decoder = DirectiveDecoder::new().unwrap();

    let decoded = decoder.decode("Sure [show_video]");

    assert_eq!(decoded.trigger, None);
    assert_eq!(decoded.cleaned, "Sure [show_video]");
}

#[test]
fn test_decoded_response_serializes_trigger_lowercase() {
    let decoder = DirectiveDecoder::new().unwrap();

    let decoded = decoder.decode("Deal! [SHOW_OFFER:early,bundle]");
    let json = serde_json::to_value(&decoded).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "cleaned": "Deal!",
            "trigger": "offer",
            "trigger_args": ["early", "bundle"]
        })
    );
}
