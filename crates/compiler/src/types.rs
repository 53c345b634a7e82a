//! Type system for the C subset
//!
//! Two scalar types (32-bit `int`, 64-bit `long`) plus function types.
//! Equality is structural; the common-type rule is simply "the wider of the
//! two".

/// Types assigned to expressions and symbols
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// Function type: parameter types plus return type
    Function { params: Vec<Type>, ret: Box<Type> },
}

impl Type {
    /// Size of a scalar in bytes. Function types have no size.
    pub fn size(&self) -> Option<u8> {
        match self {
            Type::Int => Some(4),
            Type::Long => Some(8),
            Type::Function { .. } => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Int | Type::Long)
    }

    /// The common type of two scalars: `Long` if either is `Long`, else `Int`.
    pub fn common_type(lhs: &Type, rhs: &Type) -> Type {
        if *lhs == Type::Long || *rhs == Type::Long {
            Type::Long
        } else {
            Type::Int
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Function { params, ret } => {
                let params: Vec<_> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "({}) -> {}", params.join(", "), ret)
            }
        }
    }
}

/// A typed integer constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Const {
    Int(i32),
    Long(i64),
}

impl Const {
    pub fn ty(&self) -> Type {
        match self {
            Const::Int(_) => Type::Int,
            Const::Long(_) => Type::Long,
        }
    }

    /// The value widened to `i64` (sign-extending `int` constants).
    pub fn as_i64(&self) -> i64 {
        match self {
            Const::Int(v) => i64::from(*v),
            Const::Long(v) => *v,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_i64() == 0
    }

    /// Convert to another scalar type, truncating or sign-extending as C does.
    pub fn convert_to(&self, target: &Type) -> Const {
        match target {
            Type::Int => Const::Int(self.as_i64() as i32),
            Type::Long => Const::Long(self.as_i64()),
            Type::Function { .. } => unreachable!("constants never have function type"),
        }
    }
}

impl std::fmt::Display for Const {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Const::Int(v) => write!(f, "{}", v),
            Const::Long(v) => write!(f, "{}L", v),
        }
    }
}

/// Initializer of a static variable after type checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticInit {
    Int(i32),
    Long(i64),
}

impl StaticInit {
    /// The zero initializer for a scalar type (used for tentative definitions).
    pub fn zero(ty: &Type) -> StaticInit {
        match ty {
            Type::Int => StaticInit::Int(0),
            Type::Long => StaticInit::Long(0),
            Type::Function { .. } => unreachable!("static variables never have function type"),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            StaticInit::Int(v) => *v == 0,
            StaticInit::Long(v) => *v == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_type_widens() {
        assert_eq!(Type::common_type(&Type::Int, &Type::Int), Type::Int);
        assert_eq!(Type::common_type(&Type::Int, &Type::Long), Type::Long);
        assert_eq!(Type::common_type(&Type::Long, &Type::Int), Type::Long);
        assert_eq!(Type::common_type(&Type::Long, &Type::Long), Type::Long);
    }

    #[test]
    fn test_const_truncation_wraps() {
        // 2^32 truncates to 0, 2^32 + 5 to 5
        assert_eq!(Const::Long(4294967296).convert_to(&Type::Int), Const::Int(0));
        assert_eq!(Const::Long(4294967301).convert_to(&Type::Int), Const::Int(5));
        // Negative values sign-extend back and forth
        assert_eq!(Const::Int(-1).convert_to(&Type::Long), Const::Long(-1));
    }

    #[test]
    fn test_zero_init_matches_type() {
        assert_eq!(StaticInit::zero(&Type::Int), StaticInit::Int(0));
        assert_eq!(StaticInit::zero(&Type::Long), StaticInit::Long(0));
        assert!(StaticInit::Long(0).is_zero());
        assert!(!StaticInit::Int(3).is_zero());
    }

    #[test]
    fn test_function_type_display() {
        let ty = Type::Function {
            params: vec![Type::Int, Type::Long],
            ret: Box::new(Type::Int),
        };
        assert_eq!(ty.to_string(), "(int, long) -> int");
    }
}
