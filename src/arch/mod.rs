pub mod tensor_array;
