// Copyright (c) 2023 The hwcoin Developers

/// Declare a message struct with its field descriptor table.
///
/// Each field is declared as `TAG LABEL KIND name: Type`, where `LABEL` is
/// a [`Label`][crate::codec::Label] and `KIND` a [`Kind`][crate::codec::Kind]
/// variant. Table order is declaration order.
macro_rules! message {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $tag:literal $label:ident $kind:ident $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug, Default)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
        }

        impl $crate::codec::Message for $name {
            const NAME: &'static str = stringify!($name);

            const FIELDS: &'static [$crate::codec::FieldDesc] = &[
                $(
                    $crate::codec::FieldDesc::new(
                        $tag,
                        stringify!($field),
                        $crate::codec::Label::$label,
                        $crate::codec::Kind::$kind,
                    ),
                )*
            ];

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn field(&self, index: usize) -> Option<&dyn $crate::codec::Field> {
                let mut i = 0;
                $(
                    if i == index {
                        return Some(&self.$field);
                    }
                    i += 1;
                )*
                None
            }

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn field_mut(&mut self, index: usize) -> Option<&mut dyn $crate::codec::Field> {
                let mut i = 0;
                $(
                    if i == index {
                        return Some(&mut self.$field);
                    }
                    i += 1;
                )*
                None
            }
        }

        impl $crate::codec::Field for $name {
            fn clear(&mut self) {
                $crate::codec::reset(self)
            }

            fn merge(
                &mut self,
                _kind: $crate::codec::Kind,
                wire: $crate::codec::WireType,
                r: &mut $crate::codec::Reader<'_>,
            ) -> Result<(), $crate::codec::DecodeError> {
                $crate::codec::merge_nested(self, wire, r)
            }

            fn encode(
                &self,
                tag: u32,
                _kind: $crate::codec::Kind,
                s: &mut dyn $crate::codec::Sink,
            ) -> Result<(), $crate::codec::EncodeError> {
                $crate::codec::encode_nested(self, tag, s)
            }
        }
    };
}

/// Declare an `i32` wire enumeration, the first variant is the default
macro_rules! enumeration {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(#[$fdoc:meta])*
            $first:ident = $fvalue:literal,
            $(
                $(#[$vdoc:meta])*
                $variant:ident = $value:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, PartialEq, Eq, Debug,
            num_enum::TryFromPrimitive, num_enum::IntoPrimitive,
            strum::Display, strum::EnumIter,
        )]
        #[repr(i32)]
        pub enum $name {
            $(#[$fdoc])*
            $first = $fvalue,
            $(
                $(#[$vdoc])*
                $variant = $value,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$first
            }
        }

        impl $crate::codec::Field for $name {
            fn clear(&mut self) {
                *self = $name::$first;
            }

            fn merge(
                &mut self,
                kind: $crate::codec::Kind,
                wire: $crate::codec::WireType,
                r: &mut $crate::codec::Reader<'_>,
            ) -> Result<(), $crate::codec::DecodeError> {
                let mut raw = 0i32;
                $crate::codec::Field::merge(&mut raw, kind, wire, r)?;
                *self = $name::try_from(raw).map_err(|_| $crate::codec::DecodeError::InvalidEnum)?;
                Ok(())
            }

            fn encode(
                &self,
                tag: u32,
                kind: $crate::codec::Kind,
                s: &mut dyn $crate::codec::Sink,
            ) -> Result<(), $crate::codec::EncodeError> {
                let raw: i32 = (*self).into();
                $crate::codec::Field::encode(&raw, tag, kind, s)
            }
        }
    };
}

/// Bind message structs to their wire type identifiers
macro_rules! message_ids {
    ($($msg:ty => $id:ident),* $(,)?) => {
        $(
            impl $crate::MessageId for $msg {
                const MESSAGE_TYPE: $crate::MessageType = $crate::MessageType::$id;
            }
        )*
    };
}
