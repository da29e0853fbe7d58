use std::sync::Arc;

/// Clocked behaviour shared by every simulated block.
pub trait ModuleBehaviors {
    /// Advance the block by one clock cycle.
    fn tick_one(&mut self);

    /// Return the block to its post-construction state.
    fn reset(&mut self) {}
}

pub trait Parameterizable {
    type ConfigType;

    fn conf(&self) -> &Self::ConfigType;

    fn init_conf(&mut self, conf: Arc<Self::ConfigType>);
}
