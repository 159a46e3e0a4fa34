mod shallow_tests;
