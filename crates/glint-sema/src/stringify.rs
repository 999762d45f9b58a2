//! Type rendering for diagnostics.
//!
//! [`TypeStringifier`] is the sole API by which error messages reference
//! symbols: it looks alias, struct, module and external-block names up in
//! the context tables. No other component formats types.

use glint_ast::ty::{ExpressionType, ImageDim, PrimitiveType};

use crate::context::{TransformerContext, TypeContent};

pub struct TypeStringifier<'a> {
    context: &'a TransformerContext,
}

impl<'a> TypeStringifier<'a> {
    pub fn new(context: &'a TransformerContext) -> Self {
        Self { context }
    }

    fn struct_name(&self, index: usize) -> String {
        self.context
            .structs
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, data)| data.description.name.clone())
            .unwrap_or_else(|| format!("<struct #{index}>"))
    }

    fn alias_name(&self, index: usize) -> String {
        self.context
            .aliases
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, data)| data.name.clone())
            .unwrap_or_else(|| format!("<alias #{index}>"))
    }

    fn module_name(&self, index: usize) -> String {
        self.context
            .modules
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, data)| data.name.clone())
            .unwrap_or_else(|| format!("<module #{index}>"))
    }

    fn external_block_name(&self, index: usize) -> String {
        self.context
            .named_external_blocks
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, data)| data.name.clone())
            .unwrap_or_else(|| format!("<external #{index}>"))
    }

    fn type_name(&self, index: usize) -> String {
        self.context
            .types
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, data)| match &data.content {
                TypeContent::Full(_) => data.name.clone(),
                TypeContent::Partial(_) => format!("{} (partial)", data.name),
            })
            .unwrap_or_else(|| format!("<type #{index}>"))
    }

    fn dim_suffix(dim: ImageDim) -> &'static str {
        match dim {
            ImageDim::Dim1D => "1D",
            ImageDim::Dim1DArray => "1D_array",
            ImageDim::Dim2D => "2D",
            ImageDim::Dim2DArray => "2D_array",
            ImageDim::Dim3D => "3D",
            ImageDim::Cubemap => "_cube",
        }
    }

    /// Render `ty` for a diagnostic.
    pub fn format(&self, ty: &ExpressionType) -> String {
        match ty {
            ExpressionType::NoType => "()".into(),
            ExpressionType::Primitive(p) => p.name().into(),
            ExpressionType::Vector(v) => format!(
                "vec{}[{}]",
                v.component_count,
                PrimitiveType::name(v.component_type)
            ),
            ExpressionType::Matrix(m) => {
                if m.column_count == m.row_count {
                    format!("mat{}[{}]", m.column_count, m.component_type.name())
                } else {
                    format!(
                        "mat{}x{}[{}]",
                        m.column_count,
                        m.row_count,
                        m.component_type.name()
                    )
                }
            }
            ExpressionType::Array(a) => {
                if a.length == 0 {
                    format!("array[{}]", self.format(&a.contained))
                } else {
                    format!("array[{}, {}]", self.format(&a.contained), a.length)
                }
            }
            ExpressionType::DynArray(a) => format!("dyn_array[{}]", self.format(&a.contained)),
            ExpressionType::Struct(index) => self.struct_name(*index),
            ExpressionType::Function(index) => {
                let name = self
                    .context
                    .functions
                    .iter()
                    .find(|(i, _)| i == index)
                    .map(|(_, data)| data.name.clone())
                    .unwrap_or_else(|| format!("<function #{index}>"));
                format!("fn {name}")
            }
            ExpressionType::IntrinsicFunction(kind) => {
                format!("intrinsic {}", kind.function_name().unwrap_or("<method>"))
            }
            ExpressionType::Sampler(s) => {
                let prefix = if s.depth { "depth_sampler" } else { "sampler" };
                format!("{prefix}{}", Self::dim_suffix(s.dim))
            }
            ExpressionType::Texture(t) => format!("texture{}", Self::dim_suffix(t.dim)),
            ExpressionType::Storage(s) => {
                format!("storage[{}]", self.struct_name(s.struct_index))
            }
            ExpressionType::Uniform(u) => {
                format!("uniform[{}]", self.struct_name(u.struct_index))
            }
            ExpressionType::PushConstant(p) => {
                format!("push_constant[{}]", self.struct_name(p.struct_index))
            }
            ExpressionType::Alias(a) => format!(
                "{} (alias of {})",
                self.alias_name(a.alias_index),
                self.format(&a.target)
            ),
            ExpressionType::Module(index) => format!("module {}", self.module_name(*index)),
            ExpressionType::NamedExternalBlock(index) => {
                format!("external {}", self.external_block_name(*index))
            }
            ExpressionType::Method(m) => {
                format!("method #{} of {}", m.method_index, self.format(&m.object))
            }
            ExpressionType::Type(index) => self.type_name(*index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_ast::ty::{ArrayType, VectorType};

    #[test]
    fn formats_without_tables() {
        let context = TransformerContext::new();
        let s = TypeStringifier::new(&context);
        assert_eq!(s.format(&ExpressionType::Primitive(PrimitiveType::Float32)), "f32");
        assert_eq!(
            s.format(&ExpressionType::Vector(VectorType {
                component_count: 3,
                component_type: PrimitiveType::Float32
            })),
            "vec3[f32]"
        );
        assert_eq!(
            s.format(&ExpressionType::Array(ArrayType {
                contained: Box::new(ExpressionType::Primitive(PrimitiveType::UInt32)),
                length: 4
            })),
            "array[u32, 4]"
        );
    }
}
