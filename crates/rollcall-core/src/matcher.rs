/// Resolves a captured image to the identity of a registered person.
///
/// The reconciler only needs a name; how the match is made (which model,
/// which reference images, which threshold) is up to the implementation.
pub trait FaceMatcher<I: ?Sized> {
    type Error: std::error::Error;

    /// The best-matching registered name, or `None` when nobody matches.
    fn best_match_name(&self, image: &I) -> Result<Option<String>, Self::Error>;
}
