//! Method return types
//!
//! `MethodReturn` ties a Rust return type to its declared shape and to the
//! `SqlMapper` operation that produces it for a resolved behavior.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::{MapperError, Result, Value, ValueKind};
use crate::evaluator::RequestContext;
use crate::executor::{SqlMapper, TypeShape};
use crate::mapping::{DataSet, DataTable, Entity, FromValue, MultipleResult, ResultElement};
use crate::statement::ExecuteBehavior;

#[async_trait]
pub trait MethodReturn: Sized + Send {
    fn shape() -> TypeShape;

    fn invoke(mapper: &Arc<SqlMapper>, behavior: ExecuteBehavior, ctx: &mut RequestContext) -> Result<Self>;

    async fn invoke_async(
        mapper: &Arc<SqlMapper>,
        behavior: ExecuteBehavior,
        ctx: &mut RequestContext,
    ) -> Result<Self>;
}

fn mismatch(ctx: &RequestContext, behavior: ExecuteBehavior, target: &str) -> MapperError {
    MapperError::ShapeMismatch {
        statement: ctx.statement_key(),
        reason: format!("{behavior:?} cannot produce {target}"),
    }
}

fn from_scalar<T: FromValue>(ctx: &RequestContext, value: Value) -> Result<T> {
    T::from_value(value).map_err(|found| MapperError::Conversion {
        target: ctx.statement_key(),
        expected: T::KIND.to_string(),
        found: found.to_string(),
    })
}

fn invoke_scalar<T: FromValue + Entity>(
    mapper: &SqlMapper,
    behavior: ExecuteBehavior,
    ctx: &mut RequestContext,
) -> Result<T> {
    match behavior {
        ExecuteBehavior::Execute => {
            let affected = mapper.execute(ctx)?;
            from_scalar(ctx, Value::Integer(affected))
        }
        ExecuteBehavior::ExecuteScalar => mapper.execute_scalar(ctx),
        ExecuteBehavior::QuerySingle => {
            let row = mapper.query_single::<T>(ctx)?;
            row.map_or_else(|| from_scalar(ctx, Value::Null), Ok)
        }
        other => Err(mismatch(ctx, other, T::TYPE_NAME)),
    }
}

async fn invoke_scalar_async<T: FromValue + Entity>(
    mapper: &SqlMapper,
    behavior: ExecuteBehavior,
    ctx: &mut RequestContext,
) -> Result<T> {
    match behavior {
        ExecuteBehavior::Execute => {
            let affected = mapper.execute_async(ctx).await?;
            from_scalar(ctx, Value::Integer(affected))
        }
        ExecuteBehavior::ExecuteScalar => mapper.execute_scalar_async(ctx).await,
        ExecuteBehavior::QuerySingle => {
            let row = mapper.query_single_async::<T>(ctx).await?;
            row.map_or_else(|| from_scalar(ctx, Value::Null), Ok)
        }
        other => Err(mismatch(ctx, other, T::TYPE_NAME)),
    }
}

#[async_trait]
impl MethodReturn for () {
    fn shape() -> TypeShape {
        TypeShape::Void
    }

    fn invoke(mapper: &Arc<SqlMapper>, behavior: ExecuteBehavior, ctx: &mut RequestContext) -> Result<Self> {
        match behavior {
            ExecuteBehavior::Execute => mapper.execute(ctx).map(|_| ()),
            ExecuteBehavior::ExecuteScalar => mapper.execute_scalar::<Value>(ctx).map(|_| ()),
            other => Err(mismatch(ctx, other, "()")),
        }
    }

    async fn invoke_async(
        mapper: &Arc<SqlMapper>,
        behavior: ExecuteBehavior,
        ctx: &mut RequestContext,
    ) -> Result<Self> {
        match behavior {
            ExecuteBehavior::Execute => mapper.execute_async(ctx).await.map(|_| ()),
            ExecuteBehavior::ExecuteScalar => mapper.execute_scalar_async::<Value>(ctx).await.map(|_| ()),
            other => Err(mismatch(ctx, other, "()")),
        }
    }
}

macro_rules! scalar_return {
    ($($ty:ty => $shape:expr),* $(,)?) => {
        $(
            #[async_trait]
            impl MethodReturn for $ty {
                fn shape() -> TypeShape {
                    $shape
                }

                fn invoke(
                    mapper: &Arc<SqlMapper>,
                    behavior: ExecuteBehavior,
                    ctx: &mut RequestContext,
                ) -> Result<Self> {
                    invoke_scalar(mapper, behavior, ctx)
                }

                async fn invoke_async(
                    mapper: &Arc<SqlMapper>,
                    behavior: ExecuteBehavior,
                    ctx: &mut RequestContext,
                ) -> Result<Self> {
                    invoke_scalar_async(mapper, behavior, ctx).await
                }
            }
        )*
    };
}

scalar_return! {
    i64 => TypeShape::Integer,
    i32 => TypeShape::Integer,
    i16 => TypeShape::Integer,
    u32 => TypeShape::Integer,
    u64 => TypeShape::Integer,
    f64 => TypeShape::Scalar(ValueKind::Real),
    f32 => TypeShape::Scalar(ValueKind::Real),
    bool => TypeShape::Scalar(ValueKind::Boolean),
    String => TypeShape::Scalar(ValueKind::Text),
    Decimal => TypeShape::Scalar(ValueKind::Numeric),
    NaiveDate => TypeShape::Scalar(ValueKind::Date),
    NaiveDateTime => TypeShape::Scalar(ValueKind::Timestamp),
    DateTime<Utc> => TypeShape::Scalar(ValueKind::TimestampTz),
    Uuid => TypeShape::Scalar(ValueKind::Uuid),
    Value => TypeShape::Scalar(ValueKind::Any),
}

/// Nullable scalar, or the first row of an entity query
#[async_trait]
impl<T: Entity> MethodReturn for Option<T> {
    fn shape() -> TypeShape {
        match T::SCALAR {
            Some(kind) => TypeShape::Scalar(kind),
            None => TypeShape::Entity(T::TYPE_NAME),
        }
    }

    fn invoke(mapper: &Arc<SqlMapper>, behavior: ExecuteBehavior, ctx: &mut RequestContext) -> Result<Self> {
        match behavior {
            ExecuteBehavior::QuerySingle => mapper.query_single(ctx),
            ExecuteBehavior::GetNested => mapper.get_nested(ctx),
            ExecuteBehavior::ExecuteScalar if T::SCALAR.is_some() => {
                let value: Value = mapper.execute_scalar(ctx)?;
                if value.is_null() { Ok(None) } else { T::from_scalar(value).map(Some) }
            }
            ExecuteBehavior::Execute if T::SCALAR.is_some() => {
                let affected = mapper.execute(ctx)?;
                T::from_scalar(Value::Integer(affected)).map(Some)
            }
            other => Err(mismatch(ctx, other, T::TYPE_NAME)),
        }
    }

    async fn invoke_async(
        mapper: &Arc<SqlMapper>,
        behavior: ExecuteBehavior,
        ctx: &mut RequestContext,
    ) -> Result<Self> {
        match behavior {
            ExecuteBehavior::QuerySingle => mapper.query_single_async(ctx).await,
            ExecuteBehavior::GetNested => mapper.get_nested_async(ctx).await,
            ExecuteBehavior::ExecuteScalar if T::SCALAR.is_some() => {
                let value: Value = mapper.execute_scalar_async(ctx).await?;
                if value.is_null() { Ok(None) } else { T::from_scalar(value).map(Some) }
            }
            ExecuteBehavior::Execute if T::SCALAR.is_some() => {
                let affected = mapper.execute_async(ctx).await?;
                T::from_scalar(Value::Integer(affected)).map(Some)
            }
            other => Err(mismatch(ctx, other, T::TYPE_NAME)),
        }
    }
}

#[async_trait]
impl<T: Entity> MethodReturn for Vec<T> {
    fn shape() -> TypeShape {
        TypeShape::Collection(T::TYPE_NAME)
    }

    fn invoke(mapper: &Arc<SqlMapper>, behavior: ExecuteBehavior, ctx: &mut RequestContext) -> Result<Self> {
        match behavior {
            ExecuteBehavior::Query => mapper.query(ctx),
            other => Err(mismatch(ctx, other, T::TYPE_NAME)),
        }
    }

    async fn invoke_async(
        mapper: &Arc<SqlMapper>,
        behavior: ExecuteBehavior,
        ctx: &mut RequestContext,
    ) -> Result<Self> {
        match behavior {
            ExecuteBehavior::Query => mapper.query_async(ctx).await,
            other => Err(mismatch(ctx, other, T::TYPE_NAME)),
        }
    }
}

#[async_trait]
impl MethodReturn for DataTable {
    fn shape() -> TypeShape {
        TypeShape::Table
    }

    fn invoke(mapper: &Arc<SqlMapper>, behavior: ExecuteBehavior, ctx: &mut RequestContext) -> Result<Self> {
        match behavior {
            ExecuteBehavior::GetDataTable => mapper.get_table(ctx),
            other => Err(mismatch(ctx, other, "DataTable")),
        }
    }

    async fn invoke_async(
        mapper: &Arc<SqlMapper>,
        behavior: ExecuteBehavior,
        ctx: &mut RequestContext,
    ) -> Result<Self> {
        match behavior {
            ExecuteBehavior::GetDataTable => mapper.get_table_async(ctx).await,
            other => Err(mismatch(ctx, other, "DataTable")),
        }
    }
}

#[async_trait]
impl MethodReturn for DataSet {
    fn shape() -> TypeShape {
        TypeShape::DataSet
    }

    fn invoke(mapper: &Arc<SqlMapper>, behavior: ExecuteBehavior, ctx: &mut RequestContext) -> Result<Self> {
        match behavior {
            ExecuteBehavior::GetDataSet => mapper.get_dataset(ctx),
            other => Err(mismatch(ctx, other, "DataSet")),
        }
    }

    async fn invoke_async(
        mapper: &Arc<SqlMapper>,
        behavior: ExecuteBehavior,
        ctx: &mut RequestContext,
    ) -> Result<Self> {
        match behavior {
            ExecuteBehavior::GetDataSet => mapper.get_dataset_async(ctx).await,
            other => Err(mismatch(ctx, other, "DataSet")),
        }
    }
}

/// Accessor member: hands back the bound mapper
#[async_trait]
impl MethodReturn for Arc<SqlMapper> {
    fn shape() -> TypeShape {
        TypeShape::Accessor
    }

    fn invoke(mapper: &Arc<SqlMapper>, _: ExecuteBehavior, _: &mut RequestContext) -> Result<Self> {
        Ok(Arc::clone(mapper))
    }

    async fn invoke_async(mapper: &Arc<SqlMapper>, _: ExecuteBehavior, _: &mut RequestContext) -> Result<Self> {
        Ok(Arc::clone(mapper))
    }
}

macro_rules! tuple_return {
    ($($name:ident),+) => {
        #[async_trait]
        impl<$($name: ResultElement),+> MethodReturn for ($($name,)+) {
            fn shape() -> TypeShape {
                TypeShape::Tuple(<Self as MultipleResult>::shapes())
            }

            fn invoke(
                mapper: &Arc<SqlMapper>,
                behavior: ExecuteBehavior,
                ctx: &mut RequestContext,
            ) -> Result<Self> {
                match behavior {
                    ExecuteBehavior::FillMultiple => mapper.fill_multiple(ctx),
                    other => Err(mismatch(ctx, other, "a tuple")),
                }
            }

            async fn invoke_async(
                mapper: &Arc<SqlMapper>,
                behavior: ExecuteBehavior,
                ctx: &mut RequestContext,
            ) -> Result<Self> {
                match behavior {
                    ExecuteBehavior::FillMultiple => mapper.fill_multiple_async(ctx).await,
                    other => Err(mismatch(ctx, other, "a tuple")),
                }
            }
        }
    };
}

tuple_return!(A);
tuple_return!(A, B);
tuple_return!(A, B, C);
tuple_return!(A, B, C, D);
tuple_return!(A, B, C, D, E);
tuple_return!(A, B, C, D, E, F);
tuple_return!(A, B, C, D, E, F, G);
tuple_return!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_entity;
    use crate::mapping::ElementShape;

    #[derive(Debug, Default)]
    struct Person {
        id: i64,
    }

    impl_entity!(Person { id: i64 });

    #[test]
    fn test_shapes() {
        assert_eq!(<()>::shape(), TypeShape::Void);
        assert_eq!(i32::shape(), TypeShape::Integer);
        assert_eq!(String::shape(), TypeShape::Scalar(ValueKind::Text));
        assert_eq!(<Option<i64> as MethodReturn>::shape(), TypeShape::Scalar(ValueKind::Integer));
        assert_eq!(<Option<Person> as MethodReturn>::shape(), TypeShape::Entity("Person"));
        assert_eq!(<Vec<Person> as MethodReturn>::shape(), TypeShape::Collection("Person"));
        assert_eq!(DataTable::shape(), TypeShape::Table);
        assert_eq!(Arc::<SqlMapper>::shape(), TypeShape::Accessor);
        assert_eq!(
            <(Vec<Person>, Option<Person>) as MethodReturn>::shape(),
            TypeShape::Tuple(vec![ElementShape::Many("Person"), ElementShape::Single("Person")])
        );
    }
}
