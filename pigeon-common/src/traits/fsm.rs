/// A state that advances purely from an input and a protocol-level context.
///
/// Implementations must not perform I/O; anything that needs the outside world
/// (the mail store, the directory) happens before the input is built.
pub trait FiniteStateMachine {
    type Input;
    type Context;

    /// Consume the current state and produce the next one.
    #[must_use]
    fn transition(self, input: Self::Input, context: &mut Self::Context) -> Self;
}
