mod test_aes_engine;
