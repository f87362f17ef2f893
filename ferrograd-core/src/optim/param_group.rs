use crate::autograd::VariableId;
use crate::error::Result;
use crate::nn::layer::Layer;
use crate::nn::parameter::Parameter;

/// The named parameters an optimizer was set up on.
///
/// Names are the dot-joined registry names of the target layer, so they
/// match the weight archive keys. Handles share the layer's nodes.
#[derive(Clone, Debug, Default)]
pub struct ParamGroup {
    params: Vec<(String, Parameter)>,
}

impl ParamGroup {
    pub fn new(params: Vec<(String, Parameter)>) -> Self {
        ParamGroup { params }
    }

    /// Snapshot of every trainable parameter reachable from `layer`.
    pub fn from_layer(layer: &dyn Layer) -> Self {
        ParamGroup {
            params: layer.named_params().map(|(n, p)| (n, p.clone())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.params.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().map(|(_, p)| p)
    }

    pub fn contains(&self, id: VariableId) -> bool {
        self.params.iter().any(|(_, p)| p.id() == id)
    }

    pub fn find(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Name of the parameter with `id`, or its node label if it is not part
    /// of the group.
    pub fn name_of(&self, param: &Parameter) -> String {
        self.params
            .iter()
            .find(|(_, p)| p.id() == param.id())
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| param.label())
    }

    /// Members that currently hold a gradient, in registration order.
    pub fn with_grads(&self) -> Result<Vec<Parameter>> {
        let mut out = Vec::new();
        for (_, p) in &self.params {
            if p.grad_tensor()?.is_some() {
                out.push(p.clone());
            }
        }
        Ok(out)
    }
}
