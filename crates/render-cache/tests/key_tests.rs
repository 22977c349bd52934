//! Key stability across resolution: equal requests collide, different
//! requests and reloaded datasets do not.

use render_cache::CacheKey;
use test_utils::quokka_handle;
use viz_protocol::{ParameterResolver, RawRenderRequest, RenderPurpose};

fn key(handle: &viz_common::DatasetHandle, pairs: &[(&str, &str)]) -> CacheKey {
    let raw = RawRenderRequest::from_pairs(pairs.iter().copied());
    let params = ParameterResolver::default()
        .resolve(&raw, handle.catalog(), RenderPurpose::Interactive)
        .unwrap();
    CacheKey::build(handle.identity(), &params)
}

#[test]
fn test_resolve_then_key_is_idempotent() {
    let handle = quokka_handle("plt00000");
    let pairs = [("field", "gas:temperature"), ("axis", "x"), ("vmin", "1e-3")];
    assert_eq!(key(&handle, &pairs), key(&handle, &pairs));
}

#[test]
fn test_particle_selection_order_is_irrelevant() {
    let handle = quokka_handle("plt00000");
    assert_eq!(
        key(&handle, &[("particles", "CIC_particles,Sink_particles")]),
        key(&handle, &[("particles", "Sink_particles,CIC_particles")])
    );
}

#[test]
fn test_reload_changes_key() {
    let before = quokka_handle("plt00000");
    let after = quokka_handle("plt00000");
    assert_ne!(key(&before, &[]), key(&after, &[]));
    assert_eq!(key(&before, &[]).dataset(), before.id());
}

#[test]
fn test_equivalent_spellings_share_a_key() {
    let handle = quokka_handle("plt00000");
    assert_eq!(
        key(&handle, &[("kind", "slice"), ("field", "density"), ("log_scale", "1")]),
        key(&handle, &[("kind", "slc"), ("field", "gas:density"), ("log_scale", "true")])
    );
}

#[test]
fn test_full_domain_width_is_stable() {
    let handle = quokka_handle("plt00000");
    let a = key(&handle, &[]);
    let b = key(&handle, &[("width_unit", "pc")]);
    assert_eq!(a, b);
    assert_ne!(a, key(&handle, &[("width_value", "1"), ("width_unit", "pc")]));
}

#[test]
fn test_different_fields_differ() {
    let handle = quokka_handle("plt00000");
    assert_ne!(
        key(&handle, &[("field", "gas:density")]),
        key(&handle, &[("field", "boxlib:gasDensity")])
    );
}
