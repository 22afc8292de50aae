use peroxide::fuga::ODEProblem;

use crate::model::model::Model;

/// A model bound to a fixed parameter vector, ready for integration
#[derive(Debug, Clone, Copy)]
pub struct ODESystem<'a> {
    model: &'a Model,
    params: &'a [f64],
}

impl<'a> ODESystem<'a> {
    pub fn new(model: &'a Model, params: &'a [f64]) -> Self {
        Self { model, params }
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    pub fn params(&self) -> &[f64] {
        self.params
    }
}

impl ODEProblem for ODESystem<'_> {
    // The system is autonomous, `t` is not used
    fn rhs(&self, _t: f64, y: &[f64], dy: &mut [f64]) -> Result<(), argmin_math::Error> {
        self.model.derivative(y, self.params, dy)?;
        Ok(())
    }
}
