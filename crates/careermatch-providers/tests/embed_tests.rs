use careermatch_core::config::{EmbeddingBackend, EmbeddingSettings, NarrativeBackend, NarrativeSettings};
use careermatch_core::traits::EmbeddingProvider;
use careermatch_core::Error;
use careermatch_providers::{get_default_embedder, get_narrator, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb)
}

#[tokio::test]
async fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid any network call
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let embedder = get_default_embedder(&EmbeddingSettings::default()).expect("embedder");
    assert!(embedder.embedder_id().starts_with("hash:"));
    let v1 = embedder.embed("hello world").await.expect("embed");
    let v2 = embedder.embed("hello world").await.expect("embed");

    assert_eq!(v1.len(), 1024, "default dimension is 1024");
    assert_eq!(v1, v2, "identical text gives identical vectors");
    assert_eq!(v1.iter().sum::<f32>(), 2.0, "one count per token");
}

#[tokio::test]
async fn shared_vocabulary_scores_higher() {
    let embedder = HashEmbedder::new(1024);
    let query = embedder.embed("rust async networking").await.unwrap();
    let close = embedder.embed("async rust services and networking").await.unwrap();
    let far = embedder.embed("watercolor painting classes").await.unwrap();
    assert!(cosine(&query, &close) > cosine(&query, &far));
}

#[tokio::test]
async fn empty_text_yields_zero_vector() {
    let embedder = HashEmbedder::new(16);
    let v = embedder.embed("  ,, ").await.unwrap();
    assert_eq!(v.len(), 16);
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn hash_dimension_is_part_of_the_id() {
    assert_ne!(HashEmbedder::new(64).embedder_id(), HashEmbedder::new(128).embedder_id());
    assert_eq!(HashEmbedder::new(0).dim(), 1);
}

#[test]
fn configured_hash_backend_needs_no_api_key() {
    let settings = EmbeddingSettings { provider: EmbeddingBackend::Hash, dimension: 32, ..Default::default() };
    let embedder = get_default_embedder(&settings).expect("hash embedder");
    assert_eq!(embedder.embedder_id(), "hash:xxh64:d32");
}

#[test]
fn narrator_respects_enabled_flag_and_missing_keys() {
    let disabled = NarrativeSettings { enabled: false, ..Default::default() };
    assert!(get_narrator(&disabled).expect("disabled").is_none());

    let template = NarrativeSettings { provider: NarrativeBackend::Template, ..Default::default() };
    let narrator = get_narrator(&template).expect("template").expect("enabled");
    assert_eq!(narrator.generator_id(), "template");

    let missing_key = NarrativeSettings { api_key_env: "CAREERMATCH_TEST_NO_SUCH_KEY".into(), ..Default::default() };
    let err = get_narrator(&missing_key).err().expect("missing key");
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err}");
}
