//! Tags and names from the class file format.

pub const MAGIC: u32 = 0xCAFE_BABE;

pub mod flags {
	pub const ACC_PUBLIC: u16 = 0x0001;
	pub const ACC_SUPER: u16  = 0x0020;
}

pub mod pool {
	pub const UTF8: u8                 = 1;
	pub const INTEGER: u8              = 3;
	pub const FLOAT: u8                = 4;
	pub const LONG: u8                 = 5;
	pub const DOUBLE: u8               = 6;
	pub const CLASS: u8                = 7;
	pub const STRING: u8               = 8;
	pub const FIELD_REF: u8            = 9;
	pub const METHOD_REF: u8           = 10;
	pub const INTERFACE_METHOD_REF: u8 = 11;
	pub const NAME_AND_TYPE: u8        = 12;
	pub const METHOD_HANDLE: u8        = 15;
	pub const METHOD_TYPE: u8          = 16;
	pub const DYNAMIC: u8              = 17;
	pub const INVOKE_DYNAMIC: u8       = 18;
	pub const MODULE: u8               = 19;
	pub const PACKAGE: u8              = 20;
}

pub mod attribute {
	pub const ANNOTATION_DEFAULT: &str                       = "AnnotationDefault";
	pub const BOOTSTRAP_METHODS: &str                        = "BootstrapMethods";
	pub const CODE: &str                                     = "Code";
	pub const ENCLOSING_METHOD: &str                         = "EnclosingMethod";
	pub const INNER_CLASSES: &str                            = "InnerClasses";
	pub const LOCAL_VARIABLE_TABLE: &str                     = "LocalVariableTable";
	pub const LOCAL_VARIABLE_TYPE_TABLE: &str                = "LocalVariableTypeTable";
	pub const RECORD: &str                                   = "Record";
	pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str            = "RuntimeInvisibleAnnotations";
	pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str  = "RuntimeInvisibleParameterAnnotations";
	pub const RUNTIME_INVISIBLE_TYPE_ANNOTATIONS: &str       = "RuntimeInvisibleTypeAnnotations";
	pub const RUNTIME_VISIBLE_ANNOTATIONS: &str              = "RuntimeVisibleAnnotations";
	pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str    = "RuntimeVisibleParameterAnnotations";
	pub const RUNTIME_VISIBLE_TYPE_ANNOTATIONS: &str         = "RuntimeVisibleTypeAnnotations";
	pub const SIGNATURE: &str                                = "Signature";
	pub const SOURCE_FILE: &str                              = "SourceFile";
}

/// The bootstrap method used by `javac` for lambdas and method references.
pub const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";
