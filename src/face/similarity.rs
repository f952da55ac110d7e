use super::MemberId;
use serde::Serialize;

/// Enrolled member with its stored (normalized) embedding.
#[derive(Debug, Clone)]
pub struct EnrolledFace {
    pub member_id: MemberId,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceMatch {
    pub member_id: MemberId,
    pub similarity: f32,
}

/// Cosine similarity. Vectors of different length, or with zero magnitude,
/// score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (dot, mag_a, mag_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, ma, mb), (x, y)| {
            (dot + x * y, ma + x * x, mb + y * y)
        });
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Scale to unit length; the zero vector is returned unchanged.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let mag = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag > 0.0 {
        v.iter().map(|x| x / mag).collect()
    } else {
        v.to_vec()
    }
}

/// Highest-similarity member at or above `threshold`.
///
/// Members without an embedding are skipped. On equal scores the first
/// member wins.
pub fn find_best_match(
    embedding: &[f32],
    members: &[EnrolledFace],
    threshold: f32,
) -> Option<FaceMatch> {
    members
        .iter()
        .filter_map(|m| {
            let stored = m.embedding.as_deref().filter(|e| !e.is_empty())?;
            Some(FaceMatch {
                member_id: m.member_id,
                similarity: cosine_similarity(embedding, stored),
            })
        })
        .filter(|m| m.similarity >= threshold)
        .fold(None, |best: Option<FaceMatch>, candidate| match best {
            Some(b) if b.similarity >= candidate.similarity => Some(b),
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(id: MemberId, v: &[f32]) -> EnrolledFace {
        EnrolledFace {
            member_id: id,
            embedding: Some(normalize(v)),
        }
    }

    #[test]
    fn similarity_is_symmetric() {
        let pairs = [
            (vec![1.0, 2.0, 3.0], vec![-2.0, 0.5, 4.0]),
            (vec![0.3, -0.7], vec![0.9, 0.1]),
            (vec![5.0, 0.0, 0.0, 1.0], vec![0.0, 1.0, 1.0, 1.0]),
        ];
        for (a, b) in pairs {
            assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
        }
    }

    #[test]
    fn normalized_vector_matches_itself() {
        let v = normalize(&[0.2, -1.5, 3.3, 0.01]);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mismatched_or_zero_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn no_match_below_threshold() {
        let members = vec![face(1, &[1.0, 0.0]), face(2, &[0.0, 1.0])];
        let query = normalize(&[1.0, 1.0]);
        // both score ~0.707
        assert_eq!(find_best_match(&query, &members, 0.75), None);
    }

    #[test]
    fn best_of_several_matches_wins() {
        let members = vec![
            face(1, &[1.0, 0.2, 0.0]),
            face(2, &[1.0, 0.0, 0.0]),
            face(3, &[0.9, 0.3, 0.1]),
        ];
        let query = normalize(&[1.0, 0.01, 0.0]);
        let m = find_best_match(&query, &members, 0.75).unwrap();
        assert_eq!(m.member_id, 2);
        assert!(m.similarity > 0.99);
    }

    #[test]
    fn members_without_embeddings_are_skipped() {
        let members = vec![
            EnrolledFace {
                member_id: 1,
                embedding: None,
            },
            EnrolledFace {
                member_id: 2,
                embedding: Some(Vec::new()),
            },
            face(3, &[0.0, 1.0]),
        ];
        let m = find_best_match(&normalize(&[0.0, 2.0]), &members, 0.75).unwrap();
        assert_eq!(m.member_id, 3);
    }
}
